//! `psproject platforms` command
//!
//! Prints the platform contexts a project resolves to.

use anyhow::Result;

use super::project_context;
use crate::cli::PathArgs;
use psproject::builder::matrix::resolve_platforms;
use psproject::core::project::ProjectConfig;

pub fn execute(args: PathArgs) -> Result<()> {
    let (_, root) = project_context(args.path.as_deref())?;
    let project = ProjectConfig::load(&root)?;
    let contexts = resolve_platforms(
        &project.platforms(),
        project.tool().arch_info,
        &project.working_dir(),
    );

    if contexts.is_empty() {
        println!("Nothing to build: no iOS or macOS platform resolved");
        return Ok(());
    }

    for ctx in &contexts {
        println!("{} ({})", ctx, ctx.target());
        println!("    Wheel platform: {}", ctx.wheel_platform());
        println!("    Site-packages:  {}", ctx.site_packages().display());
    }
    Ok(())
}
