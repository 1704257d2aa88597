//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} escaped {}", entry.path().display(), src.display()))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Remove a directory tree. A missing directory counts as success.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("failed to remove directory: {}", path.display()))
        }
    }
}

/// Delete and recreate a directory.
pub fn reset_dir(path: &Path) -> Result<()> {
    remove_dir_all_if_exists(path)?;
    ensure_dir(path)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Remove every path matching glob patterns under `base`.
///
/// Returns the removed paths.
pub fn remove_glob(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_dir() {
                        remove_dir_all_if_exists(&path)?;
                    } else {
                        fs::remove_file(&path)
                            .with_context(|| format!("failed to remove {}", path.display()))?;
                    }
                    removed.push(path);
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    removed.sort();
    Ok(removed)
}

/// Find files under `root` whose name satisfies `pred`.
pub fn find_files(root: &Path, pred: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| pred(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Last path component as a string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reset_dir_empties_contents() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("site_packages.iphoneos");
        fs::create_dir_all(dir.join("old")).unwrap();
        fs::write(dir.join("old/mod.py"), "x = 1").unwrap();

        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let tmp = TempDir::new().unwrap();
        remove_dir_all_if_exists(&tmp.path().join("absent")).unwrap();
        reset_dir(&tmp.path().join("absent")).unwrap();
        assert!(tmp.path().join("absent").is_dir());
    }

    #[test]
    fn test_remove_glob() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("kivy/tests")).unwrap();
        fs::create_dir_all(tmp.path().join("kivy/tools")).unwrap();
        fs::write(tmp.path().join("kivy/app.py"), "").unwrap();

        let removed = remove_glob(tmp.path(), &["kivy/tests", "kivy/tools", "nothing/*"]).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(tmp.path().join("kivy/app.py").exists());
        assert!(!tmp.path().join("kivy/tests").exists());
    }

    #[test]
    fn test_copy_dir_all_nested() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("a/b/file.txt"), "content").unwrap();

        copy_dir_all(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst.join("a/b/file.txt")).unwrap(), "content");
    }

    #[test]
    fn test_find_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pkg")).unwrap();
        fs::write(tmp.path().join("pkg/_a.cpython-313-darwin.so"), "").unwrap();
        fs::write(tmp.path().join("pkg/b.py"), "").unwrap();

        let found = find_files(tmp.path(), |n| n.ends_with("-darwin.so"));
        assert_eq!(found.len(), 1);
    }
}
