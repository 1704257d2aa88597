//! Requirements manifests and extra package indices.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

use crate::backend::registry::BackendRegistry;
use crate::core::platform::XcodeTarget;
use crate::core::project::ProjectConfig;
use crate::util::fs as pfs;
use crate::util::process::{find_uv, ProcessBuilder};
use crate::util::pyproject::{normalize_name, requirement_name};

/// Turns a project's lockfile into requirements text.
pub trait LockfileTranslator: Send + Sync {
    fn export(&self, project_root: &Path) -> Result<String>;
}

/// `uv export` in the project root.
#[derive(Debug, Clone)]
pub struct UvExport {
    program: PathBuf,
}

impl UvExport {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        UvExport {
            program: program.into(),
        }
    }

    /// Locate `uv` on PATH (or via `UV`).
    pub fn discover() -> Result<Self> {
        let program = find_uv().context("`uv` not found in PATH; install uv or set UV")?;
        Ok(Self::new(program))
    }

    fn command(&self, project_root: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .args([
                "export",
                "--format",
                "requirements-txt",
                "--no-hashes",
                "--no-header",
                "--no-annotate",
                "--no-dev",
                "--no-emit-project",
            ])
            .cwd(project_root)
    }
}

impl LockfileTranslator for UvExport {
    fn export(&self, project_root: &Path) -> Result<String> {
        self.command(project_root)
            .exec_stdout()
            .with_context(|| format!("failed to export requirements for {}", project_root.display()))
    }
}

/// Drop every requirement whose distribution name is in `excluded`.
///
/// Names compare after normalization. Comments and option lines are kept.
pub fn filter_requirements(text: &str, excluded: &[String]) -> String {
    let excluded: Vec<String> = excluded.iter().map(|n| normalize_name(n)).collect();
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if let Some(name) = requirement_name(line) {
            if excluded.contains(&name) {
                debug!("excluding requirement `{}`", line.trim());
                continue;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Resolve one extra-index entry.
///
/// URLs are kept verbatim. Paths are joined to `prefix` when relative and
/// rendered as `file://` URLs.
pub fn resolve_index(entry: &str, prefix: &Path) -> String {
    if entry.contains("://") {
        return entry.to_string();
    }
    let path = Path::new(entry);
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        prefix.join(path)
    };
    match Url::from_file_path(&abs) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", abs.display()),
    }
}

/// Ordered extra package indices.
///
/// Order is significant; only exact repeats are dropped, keeping the first
/// occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraIndexList {
    entries: Vec<String>,
}

impl ExtraIndexList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global indices followed by those scoped to `target`.
    pub fn for_target(project: &ProjectConfig, target: XcodeTarget, prefix: &Path) -> Self {
        let mut list = ExtraIndexList::new();
        list.extend(project.tool().extra_index.iter().map(|e| resolve_index(e, prefix)));
        list.extend(
            project
                .platform_extra_index(target)
                .iter()
                .map(|e| resolve_index(e, prefix)),
        );
        list
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = String>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writes the requirements manifest for one set of backends.
pub struct RequirementsGenerator<'a> {
    translator: &'a dyn LockfileTranslator,
}

impl<'a> RequirementsGenerator<'a> {
    pub fn new(translator: &'a dyn LockfileTranslator) -> Self {
        RequirementsGenerator { translator }
    }

    /// Requirements text with backend exclusions applied.
    pub fn generate(&self, project: &ProjectConfig, registry: &BackendRegistry) -> Result<String> {
        let exported = self.translator.export(project.root())?;
        Ok(filter_requirements(&exported, &registry.excluded_dependencies()?))
    }

    /// Generate and write `<dir>/requirements.txt`.
    pub fn write(
        &self,
        project: &ProjectConfig,
        registry: &BackendRegistry,
        dir: &Path,
    ) -> Result<PathBuf> {
        let text = self.generate(project, registry)?;
        let path = dir.join("requirements.txt");
        pfs::write_string(&path, &text)?;
        debug!("wrote {}", path.display());
        Ok(path)
    }
}
