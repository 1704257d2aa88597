//! `psproject backend` command
//!
//! Lists built-in backends and descriptor files in the shared backends
//! directory.

use anyhow::Result;

use crate::cli::{BackendArgs, BackendCommands};
use psproject::backend::registry::BackendId;
use psproject::backend::schema::DESCRIPTOR_EXTENSIONS;
use psproject::util::GlobalContext;

pub fn execute(args: BackendArgs) -> Result<()> {
    match args.command {
        BackendCommands::List => list_backends(),
    }
}

fn list_backends() -> Result<()> {
    let ctx = GlobalContext::new()?;

    println!("Built-in backends:");
    for id in BackendId::all() {
        println!("  {:<16} {}", id.as_str(), id.description());
    }
    println!();

    let dir = ctx.backends_dir();
    let mut descriptors: Vec<String> = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| DESCRIPTOR_EXTENSIONS.contains(&e))
            })
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect(),
        Err(_) => Vec::new(),
    };
    descriptors.sort();
    descriptors.dedup();

    println!("Descriptors in {}:", dir.display());
    if descriptors.is_empty() {
        println!("  (none)");
    }
    for name in descriptors {
        println!("  {}", name);
    }
    Ok(())
}
