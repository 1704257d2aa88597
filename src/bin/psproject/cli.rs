//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// psproject - configure and stage native iOS/macOS apps that embed Python
#[derive(Parser)]
#[command(name = "psproject")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh generated artifacts of an existing project
    Update(UpdateArgs),

    /// Generate the native project description
    Generate(PathArgs),

    /// Show the resolved platform contexts
    Platforms(PathArgs),

    /// Inspect available backends
    Backend(BackendArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct PathArgs {
    /// Project directory (defaults to the current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[command(subcommand)]
    pub command: UpdateCommands,
}

#[derive(Subcommand)]
pub enum UpdateCommands {
    /// Reinstall Python packages for every platform context
    SitePackages(SitePackagesArgs),

    /// Rebuild the app wheel of a cythonized project
    App(PathArgs),

    /// Regenerate the local simple index over `wheels/`
    Simple(PathArgs),
}

#[derive(Args)]
pub struct SitePackagesArgs {
    /// Project directory (defaults to the current directory)
    pub path: Option<PathBuf>,

    /// Empty each site-packages directory before installing
    #[arg(long)]
    pub reset: bool,

    /// Keep going when a platform context fails
    #[arg(long)]
    pub best_effort: bool,

    /// Stage platform contexts in parallel
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Args)]
pub struct BackendArgs {
    #[command(subcommand)]
    pub command: BackendCommands,
}

#[derive(Subcommand)]
pub enum BackendCommands {
    /// List built-in backends and installed descriptors
    List,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
