//! `psproject update` command

use anyhow::{bail, Result};

use super::project_context;
use crate::cli::{PathArgs, SitePackagesArgs, UpdateArgs, UpdateCommands};
use psproject::core::project::ProjectConfig;
use psproject::ops::cythonize::{cythonize_app, WHEELS_DIR};
use psproject::ops::simple_index::generate_simple_index;
use psproject::ops::site_packages::{FailurePolicy, StagingOptions};
use psproject::ops::update_site_packages;

pub fn execute(args: UpdateArgs) -> Result<()> {
    match args.command {
        UpdateCommands::SitePackages(args) => site_packages(args),
        UpdateCommands::App(args) => app(args),
        UpdateCommands::Simple(args) => simple(args),
    }
}

fn site_packages(args: SitePackagesArgs) -> Result<()> {
    let (ctx, root) = project_context(args.path.as_deref())?;

    // CLI flags only ever widen the config
    let build = &ctx.config().build;
    let options = StagingOptions {
        reset: args.reset,
        policy: if args.best_effort || build.best_effort {
            FailurePolicy::BestEffort
        } else {
            FailurePolicy::FailFast
        },
        parallel: args.parallel || build.parallel,
    };

    let report = update_site_packages(&ctx, &root, &options)?;
    for staged in &report.staged {
        println!("  staged {}", staged);
    }
    if !report.is_success() {
        for (platform, err) in &report.failed {
            println!("  failed {}: {}", platform, err.chain_message());
        }
        bail!(
            "{} of {} platform contexts failed",
            report.failed.len(),
            report.failed.len() + report.staged.len()
        );
    }
    Ok(())
}

fn app(args: PathArgs) -> Result<()> {
    let (_, root) = project_context(args.path.as_deref())?;
    let project = ProjectConfig::load(&root)?;
    let built = cythonize_app(&project)?;
    if !built.is_empty() {
        generate_simple_index(&root.join(WHEELS_DIR))?;
    }
    println!("Built app wheels for {} contexts", built.len());
    Ok(())
}

fn simple(args: PathArgs) -> Result<()> {
    let (_, root) = project_context(args.path.as_deref())?;
    let index = generate_simple_index(&root.join(WHEELS_DIR))?;
    println!("Wrote {}", index.display());
    Ok(())
}
