//! Recording mocks for psproject unit tests.
//!
//! Each mock stands in for one collaborator that would otherwise spawn a
//! subprocess, and records how it was called.
//!
//! # Example
//!
//! ```rust,ignore
//! use psproject::test_support::{RecordingInstaller, RecordingBackend};
//!
//! #[test]
//! fn test_example() {
//!     let installer = RecordingInstaller::new().writing("pkg/__init__.py");
//!     let log = CallLog::default();
//!     let backend = RecordingBackend::new("first", log.clone());
//!     // Build a registry and a pipeline around them...
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::backend::trait_def::Backend;
use crate::core::platform::XcodeTarget;
use crate::ops::requirements::LockfileTranslator;
use crate::ops::site_packages::{InstallMode, InstallRequest, PackageInstaller};

/// Shared, ordered record of calls across several mocks.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Lockfile translator returning fixed text.
#[derive(Debug, Default)]
pub struct RecordingTranslator {
    text: String,
    calls: Mutex<Vec<PathBuf>>,
}

impl RecordingTranslator {
    pub fn new(text: impl Into<String>) -> Self {
        RecordingTranslator {
            text: text.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Project roots passed to `export`, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl LockfileTranslator for RecordingTranslator {
    fn export(&self, project_root: &Path) -> Result<String> {
        self.calls.lock().unwrap().push(project_root.to_path_buf());
        Ok(self.text.clone())
    }
}

/// An installer call, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInstall {
    pub requirements: PathBuf,
    pub destination: PathBuf,
    pub extra_index: Vec<String>,
    pub mode: InstallMode,
    pub cwd: PathBuf,
}

/// Package installer that records requests and optionally writes a file
/// into the destination.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    writes: Option<String>,
    fail_on: Option<String>,
    calls: Mutex<Vec<RecordedInstall>>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `relative` inside every destination.
    pub fn writing(mut self, relative: impl Into<String>) -> Self {
        self.writes = Some(relative.into());
        self
    }

    /// Fail for destinations whose path contains `fragment`.
    pub fn failing_for(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on = Some(fragment.into());
        self
    }

    pub fn calls(&self) -> Vec<RecordedInstall> {
        let mut calls = self.calls.lock().unwrap().clone();
        // parallel runs record in completion order
        calls.sort_by(|a, b| a.destination.cmp(&b.destination));
        calls
    }
}

impl PackageInstaller for RecordingInstaller {
    fn install(&self, request: &InstallRequest<'_>) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedInstall {
            requirements: request.requirements.to_path_buf(),
            destination: request.destination.to_path_buf(),
            extra_index: request.extra_index.to_vec(),
            mode: request.mode.clone(),
            cwd: request.cwd.to_path_buf(),
        });
        if let Some(fragment) = &self.fail_on {
            if request.destination.to_string_lossy().contains(fragment.as_str()) {
                bail!("no matching distribution for {}", request.destination.display());
            }
        }
        if let Some(relative) = &self.writes {
            let path = request.destination.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
        }
        Ok(())
    }
}

/// Backend that logs its site-packages hook calls as `<name>:<platform>`.
pub struct RecordingBackend {
    name: String,
    log: CallLog,
    fail: bool,
}

impl RecordingBackend {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        RecordingBackend {
            name: name.into(),
            log,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn copy_to_site_packages(
        &self,
        _site_path: &Path,
        platform: XcodeTarget,
        _wheel_platform: &str,
    ) -> Result<()> {
        self.log.push(format!("{}:{}", self.name, platform));
        if self.fail {
            bail!("{} post-install failed", self.name);
        }
        Ok(())
    }

    fn install(&self, _support: &Path, platform: XcodeTarget) -> Result<()> {
        self.log.push(format!("{}:install:{}", self.name, platform));
        Ok(())
    }
}

/// Write `pyproject.toml` into `root`.
pub fn write_pyproject(root: &Path, text: &str) -> PathBuf {
    let path = root.join("pyproject.toml");
    std::fs::write(&path, text).unwrap();
    path
}
