//! Local PEP 503 package index.
//!
//! Exposes the wheels in a directory through `simple/` so pip can use the
//! directory as an extra index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::util::fs as pfs;
use crate::util::pyproject::normalize_name;

const SDIST_SUFFIXES: &[&str] = &[".tar.gz", ".zip"];

/// Distribution name encoded in a wheel or sdist file name.
pub fn distribution_name(file_name: &str) -> Option<&str> {
    if let Some(stem) = file_name.strip_suffix(".whl") {
        return stem.split('-').next().filter(|n| !n.is_empty());
    }
    SDIST_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .and_then(|stem| stem.rsplit_once('-'))
        .map(|(name, _version)| name)
        .filter(|n| !n.is_empty())
}

/// Write `<wheels_dir>/simple/` for every distribution in `wheels_dir`.
///
/// Returns the root index path. Pages for names that no longer have files
/// are left in place.
pub fn generate_simple_index(wheels_dir: &Path) -> Result<PathBuf> {
    let mut projects: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let entries = std::fs::read_dir(wheels_dir)
        .with_context(|| format!("failed to read {}", wheels_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read {}", wheels_dir.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        match distribution_name(&file_name) {
            Some(name) => projects
                .entry(normalize_name(name))
                .or_default()
                .push(file_name),
            None => debug!("skipping {}", file_name),
        }
    }

    let simple = wheels_dir.join("simple");
    for (name, files) in &mut projects {
        files.sort();
        let links: String = files
            .iter()
            .map(|f| format!("    <a href=\"../../{f}\">{f}</a><br/>\n"))
            .collect();
        pfs::write_string(
            &simple.join(name).join("index.html"),
            &page(&format!("Links for {}", name), &links),
        )?;
    }

    let links: String = projects
        .keys()
        .map(|name| format!("    <a href=\"{name}/\">{name}</a><br/>\n"))
        .collect();
    let index = simple.join("index.html");
    pfs::write_string(&index, &page("Simple index", &links))?;
    info!("indexed {} projects in {}", projects.len(), simple.display());
    Ok(index)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n  <head><title>{title}</title></head>\n  <body>\n    <h1>{title}</h1>\n{body}  </body>\n</html>\n"
    )
}
