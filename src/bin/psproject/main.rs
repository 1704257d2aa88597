//! psproject CLI - native app targets that embed CPython

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use psproject::core::errors::BuildError;
use psproject::util::diagnostic::{self, Diagnostic};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<BuildError>() {
            Some(err) => diagnostic::emit(&Diagnostic::from_build_error(err), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("psproject=debug")
    } else {
        EnvFilter::new("psproject=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Update(args) => commands::update::execute(args),
        Commands::Generate(args) => commands::generate::execute(args),
        Commands::Platforms(args) => commands::platforms::execute(args),
        Commands::Backend(args) => commands::backend::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
