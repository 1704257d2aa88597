//! Tool configuration.
//!
//! Two locations are read:
//! - Global: `<config dir>/psproject/config.toml`
//! - Project: `.psproject/config.toml` next to `pyproject.toml`
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// psproject tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub build: BuildConfig,
}

/// Filesystem locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Shared data directory holding support frameworks and backend descriptors
    pub shared: Option<PathBuf>,

    /// Host python used for cythonized builds
    pub host_python: Option<PathBuf>,
}

/// Staging behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Stage platform contexts in parallel
    pub parallel: bool,

    /// Keep going after a failed platform context
    pub best_effort: bool,

    /// Interpreter running `-m pip`
    pub python: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration, falling back to defaults if the file is absent or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.paths.shared.is_some() {
            self.paths.shared = other.paths.shared;
        }
        if other.paths.host_python.is_some() {
            self.paths.host_python = other.paths.host_python;
        }
        if other.build.python.is_some() {
            self.build.python = other.build.python;
        }
        if other.build.parallel {
            self.build.parallel = true;
        }
        if other.build.best_effort {
            self.build.best_effort = true;
        }
    }
}

/// Load merged configuration from global and project locations.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global) = global_path {
        config.merge(Config::load_or_default(global));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Global configuration file path.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "py-swift", "psproject").map(|d| d.config_dir().join("config.toml"))
}

/// Project configuration file path.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".psproject").join("config.toml")
}
