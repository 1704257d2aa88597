//! Global context for psproject operations.
//!
//! Provides centralized access to configuration, the shared data directory
//! and host tool locations.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::util::config::{self, Config};

/// Environment variable overriding the host python.
pub const HOST_PYTHON_ENV: &str = "HOST_PYTHON";

/// Per-project file naming the host python.
pub const HOST_PYTHON_FILE: &str = ".hostpython";

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "py-swift", "psproject"));

/// Default shared data directory.
///
/// On macOS this is the machine-wide `/Users/Shared/psproject`; elsewhere
/// the per-user data directory.
pub fn default_shared_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        return PathBuf::from("/Users/Shared/psproject");
    }
    match PROJECT_DIRS.as_ref() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => directories::BaseDirs::new()
            .map(|b| b.home_dir().join(".psproject"))
            .unwrap_or_else(|| PathBuf::from(".psproject")),
    }
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    shared: PathBuf,
    config: Config,
    verbose: bool,
}

impl GlobalContext {
    /// Create a context rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context for a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let global = config::global_config_path();
        let config = config::load_config(global.as_deref(), &config::project_config_path(&cwd));
        let shared = config
            .paths
            .shared
            .clone()
            .unwrap_or_else(default_shared_dir);

        GlobalContext {
            cwd,
            shared,
            config,
            verbose: false,
        }
    }

    /// Override the shared data directory.
    pub fn with_shared_dir(mut self, shared: impl Into<PathBuf>) -> Self {
        self.shared = shared.into();
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Shared data directory.
    pub fn shared_dir(&self) -> &Path {
        &self.shared
    }

    /// Directory holding provisioned frameworks and backend checkouts.
    pub fn support_dir(&self) -> PathBuf {
        self.shared.join("Support")
    }

    /// Directory searched for declarative backend descriptors.
    pub fn backends_dir(&self) -> PathBuf {
        self.shared.join("backends")
    }

    /// Resolve a project path argument against the working directory.
    pub fn resolve(&self, path: Option<&Path>) -> PathBuf {
        match path {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.cwd.join(p),
            None => self.cwd.clone(),
        }
    }

    /// Find the directory containing `pyproject.toml`, searching upward.
    pub fn find_project_root(&self, start: &Path) -> Result<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            if current.join("pyproject.toml").is_file() {
                return Ok(current);
            }
            if !current.pop() {
                anyhow::bail!(
                    "could not find `pyproject.toml` in {} or any parent directory",
                    start.display()
                );
            }
        }
    }

    /// Host python for a project.
    ///
    /// Checks `HOST_PYTHON`, then `[paths] host_python`, then the
    /// project's `.hostpython` file, then `<shared>/hostpython3`.
    pub fn host_python(&self, project_root: &Path) -> Result<PathBuf> {
        if let Ok(value) = std::env::var(HOST_PYTHON_ENV) {
            if !value.trim().is_empty() {
                return Ok(PathBuf::from(value.trim()));
            }
        }
        if let Some(path) = &self.config.paths.host_python {
            return Ok(path.clone());
        }
        let marker = project_root.join(HOST_PYTHON_FILE);
        if marker.is_file() {
            let contents = std::fs::read_to_string(&marker)
                .with_context(|| format!("failed to read {}", marker.display()))?;
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }
        Ok(self.shared.join("hostpython3"))
    }
}
