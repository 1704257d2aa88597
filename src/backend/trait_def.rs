//! Backend trait definition.
//!
//! A backend is a trusted in-process extension that contributes native
//! packages, target dependencies, generated code, plist keys and
//! site-packages post-processing. Every hook has a no-op default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use url::Url;

use crate::core::code_block::{CodeBlock, WrapperImport};
use crate::core::dependency::Dependency;
use crate::core::package_source::PackageSource;
use crate::core::platform::XcodeTarget;
use crate::core::plist::Plist;

/// Backend trait - capability interface for build backends.
///
/// Hooks are called by the orchestrators in registration order. Failures
/// are wrapped into `BuildError::Backend` with the backend name and, where
/// applicable, the platform being processed.
pub trait Backend: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &str;

    /// Other backends that must be registered before this one.
    fn backend_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Source checkout fetched into `<support>/<name>` during provisioning.
    fn remote_url(&self) -> Option<Url> {
        None
    }

    /// Frameworks this backend expects on disk after provisioning.
    fn frameworks(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Extra artifacts fetched into `<support>/<name>` before any `install`.
    fn downloads(&self) -> Vec<Url> {
        Vec::new()
    }

    /// Prepare the generated project root.
    fn configure(&self, _root: &Path) -> Result<()> {
        Ok(())
    }

    /// Native packages, by name.
    fn packages(&self) -> Result<BTreeMap<String, PackageSource>> {
        Ok(BTreeMap::new())
    }

    /// Dependencies of the app target on `platform`.
    fn target_dependencies(&self, _platform: XcodeTarget) -> Result<Vec<Dependency>> {
        Ok(Vec::new())
    }

    /// Native libraries and modules wrapped for the interpreter.
    fn wrapper_imports(&self, _platform: XcodeTarget) -> Result<Vec<WrapperImport>> {
        Ok(Vec::new())
    }

    /// Whether this backend generates the program entry point.
    ///
    /// At most one backend in a registry may return `true`.
    fn wants_main_file_rewrite(&self) -> bool {
        false
    }

    /// Code blocks for the generated entry point.
    fn main_file_edits(
        &self,
        _libraries: &[String],
        _modules: &[String],
        _platform: XcodeTarget,
    ) -> Result<Vec<CodeBlock>> {
        Ok(Vec::new())
    }

    /// Add or override `Info.plist` keys for `platform`.
    fn plist_entries(&self, _plist: &mut Plist, _platform: XcodeTarget) -> Result<()> {
        Ok(())
    }

    /// Provision per-platform support files.
    ///
    /// Must return early when a previous run already completed.
    fn install(&self, _support: &Path, _platform: XcodeTarget) -> Result<()> {
        Ok(())
    }

    /// Post-process a freshly installed site-packages directory.
    fn copy_to_site_packages(
        &self,
        _site_path: &Path,
        _platform: XcodeTarget,
        _wheel_platform: &str,
    ) -> Result<()> {
        Ok(())
    }

    /// Whether this backend edits `pyproject.toml`.
    fn wants_pyproject_rewrite(&self) -> bool {
        false
    }

    /// Edit `pyproject.toml` at `path`.
    fn pyproject_edits(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// Names removed from the requirements manifest and from the native
    /// dependencies of every target this backend contributes to.
    fn excluded_dependencies(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Paths and names shared by backend constructors.
#[derive(Debug, Clone)]
pub struct BackendEnv {
    /// `<shared>/Support`
    pub support_dir: PathBuf,
    /// `<shared>/backends`
    pub backends_dir: PathBuf,
    /// App display name
    pub app_name: String,
    /// Platforms declared by the project
    pub platforms: Vec<XcodeTarget>,
}

impl BackendEnv {
    pub fn new(support_dir: impl Into<PathBuf>, backends_dir: impl Into<PathBuf>) -> Self {
        BackendEnv {
            support_dir: support_dir.into(),
            backends_dir: backends_dir.into(),
            app_name: "App".to_string(),
            platforms: Vec::new(),
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_platforms(mut self, platforms: Vec<XcodeTarget>) -> Self {
        self.platforms = platforms;
        self
    }

    /// Per-backend support directory.
    pub fn backend_support(&self, backend: &str) -> PathBuf {
        self.support_dir.join(backend)
    }
}
