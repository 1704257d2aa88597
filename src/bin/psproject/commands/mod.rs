//! Command implementations

pub mod backend;
pub mod completions;
pub mod generate;
pub mod platforms;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::Result;
use psproject::util::GlobalContext;

/// Locate the project for a path argument and build a context rooted there.
pub fn project_context(path: Option<&Path>) -> Result<(GlobalContext, PathBuf)> {
    let ctx = GlobalContext::new()?;
    let root = ctx.find_project_root(&ctx.resolve(path))?;
    Ok((GlobalContext::with_cwd(root.clone()), root))
}
