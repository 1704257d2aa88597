//! `psproject generate` command

use anyhow::Result;

use super::project_context;
use crate::cli::PathArgs;
use psproject::ops::generate;

pub fn execute(args: PathArgs) -> Result<()> {
    let (ctx, root) = project_context(args.path.as_deref())?;
    let result = generate(&ctx, &root)?;

    println!("Generated {}", result.project_file.display());
    for target in &result.targets {
        println!("  target {}", target);
    }
    for framework in &result.provision.missing_frameworks {
        println!("  missing framework {}", framework.display());
    }
    Ok(())
}
