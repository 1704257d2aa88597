//! Format-preserving `pyproject.toml` edits and requirement name helpers.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use toml_edit::{Array, DocumentMut, Item, Table, Value};

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("static regex"));

static REQUIREMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)").expect("static regex"));

/// Normalize a distribution name (`Foo_Bar.baz` becomes `foo-bar-baz`).
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS.replace_all(name, "-").to_lowercase()
}

/// Normalized distribution name of a requirement line, if it has one.
///
/// Comments, blank lines and option lines (`-e`, `--index-url`) yield `None`.
pub fn requirement_name(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('-') {
        return None;
    }
    REQUIREMENT_NAME
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| normalize_name(m.as_str()))
}

/// A `pyproject.toml` opened for editing.
pub struct PyProjectDocument {
    path: PathBuf,
    doc: DocumentMut,
    dirty: bool,
}

impl PyProjectDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let doc = text
            .parse::<DocumentMut>()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(PyProjectDocument {
            path: path.to_path_buf(),
            doc,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries of `[project] dependencies`.
    pub fn dependencies(&self) -> Vec<String> {
        self.doc
            .get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(Item::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Add `requirement` to `[project] dependencies` unless a requirement
    /// for the same distribution is already listed.
    ///
    /// Returns `true` if the document changed.
    pub fn ensure_dependency(&mut self, requirement: &str) -> Result<bool> {
        let wanted = requirement_name(requirement)
            .with_context(|| format!("`{}` is not a requirement", requirement))?;

        let project = self
            .doc
            .entry("project")
            .or_insert(Item::Table(Table::new()))
            .as_table_like_mut()
            .context("`project` is not a table")?;

        let deps = project
            .entry("dependencies")
            .or_insert(Item::Value(Value::Array(Array::new())))
            .as_array_mut()
            .context("`project.dependencies` is not an array")?;

        let present = deps
            .iter()
            .filter_map(Value::as_str)
            .any(|d| requirement_name(d).as_deref() == Some(wanted.as_str()));
        if present {
            return Ok(false);
        }

        deps.push(requirement);
        self.dirty = true;
        Ok(true)
    }

    /// Write the document back if it was changed.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        std::fs::write(&self.path, self.doc.to_string())
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Kivy_Garden.Graph"), "kivy-garden-graph");
        assert_eq!(normalize_name("numpy"), "numpy");
    }

    #[test]
    fn test_requirement_name() {
        assert_eq!(requirement_name("kivy>=3.0.0.dev0").as_deref(), Some("kivy"));
        assert_eq!(
            requirement_name("Pillow==10.0 ; sys_platform == 'darwin'").as_deref(),
            Some("pillow")
        );
        assert_eq!(requirement_name("# via kivy"), None);
        assert_eq!(requirement_name("--extra-index-url x"), None);
        assert_eq!(requirement_name("   "), None);
    }

    #[test]
    fn test_ensure_dependency_preserves_formatting() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pyproject.toml");
        let original = "# my app\n[project]\nname = \"demo\"\ndependencies = [\"requests\"]\n\n[tool.psproject]\napp_name = \"Demo\"\n";
        std::fs::write(&path, original).unwrap();

        let mut doc = PyProjectDocument::load(&path).unwrap();
        assert!(doc.ensure_dependency("kivy").unwrap());
        assert!(!doc.ensure_dependency("Kivy>=2").unwrap());
        doc.save().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# my app\n"));
        assert!(written.contains("[tool.psproject]"));
        let doc = PyProjectDocument::load(&path).unwrap();
        assert_eq!(doc.dependencies(), vec!["requests", "kivy"]);
    }

    #[test]
    fn test_ensure_dependency_creates_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pyproject.toml");
        std::fs::write(&path, "[project]\nname = \"demo\"\n").unwrap();

        let mut doc = PyProjectDocument::load(&path).unwrap();
        doc.ensure_dependency("kivy>=3.0.0.dev0").unwrap();
        doc.save().unwrap();
        assert_eq!(
            PyProjectDocument::load(&path).unwrap().dependencies(),
            vec!["kivy>=3.0.0.dev0"]
        );
    }
}
