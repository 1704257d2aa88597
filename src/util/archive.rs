//! Gzipped tarball extraction.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;

/// Whether a file name looks like a gzipped tarball.
pub fn is_tarball(name: &str) -> bool {
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Extract a `.tar.gz` file into `dest`.
pub fn extract_tarball_file(archive: &Path, dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("failed to open archive: {}", archive.display()))?;
    extract_tarball(BufReader::new(file), dest, strip_prefix)
        .with_context(|| format!("failed to extract {}", archive.display()))
}

/// Extract a gzipped tar stream into `dest`.
///
/// With `strip_prefix`, entries under that leading directory are written
/// relative to it and the directory entry itself is skipped. Entries that
/// would land outside `dest` are rejected.
pub fn extract_tarball(data: impl Read, dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(data));

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        let relative = match strip(&entry_path, strip_prefix) {
            Some(rel) => rel,
            None => continue,
        };
        if !is_contained(&relative) {
            bail!(
                "tarball entry escapes destination directory: {}",
                entry_path.display()
            );
        }
        let output_path = dest.join(&relative);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Directory => {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            EntryType::Regular | EntryType::Continuous | EntryType::Link => {
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            EntryType::Symlink => {
                #[cfg(unix)]
                {
                    if let Some(target) = entry.link_name().context("bad symlink entry")? {
                        if output_path.symlink_metadata().is_ok() {
                            std::fs::remove_file(&output_path).ok();
                        }
                        std::os::unix::fs::symlink(target.as_ref(), &output_path).with_context(
                            || format!("failed to create symlink: {}", output_path.display()),
                        )?;
                    }
                }
                #[cfg(not(unix))]
                {
                    debug!("skipping symlink {}", entry_path.display());
                }
            }
            other => {
                debug!(
                    "skipping unsupported entry type {:?}: {}",
                    other,
                    entry_path.display()
                );
            }
        }
    }

    Ok(())
}

fn strip(path: &Path, prefix: Option<&str>) -> Option<PathBuf> {
    let Some(prefix) = prefix else {
        return Some(path.to_path_buf());
    };
    let prefix = Path::new(prefix.trim_end_matches('/'));
    match path.strip_prefix(prefix) {
        Ok(rest) if rest.as_os_str().is_empty() => None,
        Ok(rest) => Some(rest.to_path_buf()),
        Err(_) => Some(path.to_path_buf()),
    }
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
