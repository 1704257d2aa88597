//! Backends defined by descriptor files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

use crate::backend::schema::BackendConfig;
use crate::backend::script::{run_scripts, ScriptConfig};
use crate::backend::trait_def::{Backend, BackendEnv};
use crate::core::code_block::{CodeBlock, WrapperImport};
use crate::core::dependency::Dependency;
use crate::core::errors::BuildError;
use crate::core::package_source::PackageSource;
use crate::core::platform::XcodeTarget;
use crate::core::plist::Plist;
use crate::util::fs as pfs;

/// A backend driven by a validated [`BackendConfig`].
#[derive(Debug)]
pub struct DescriptorBackend {
    config: BackendConfig,
    base_dir: PathBuf,
    support_dir: PathBuf,
    downloads: Vec<Url>,
    packages: BTreeMap<String, PackageSource>,
    /// Wrapper imports by name; a name that is also a platform scopes the
    /// entry to that platform.
    wrapper_imports: Vec<(Option<XcodeTarget>, WrapperImport)>,
}

impl DescriptorBackend {
    /// Load and validate a descriptor file.
    pub fn load(path: &Path, env: &BackendEnv) -> Result<Self, BuildError> {
        let config = BackendConfig::from_path(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_config(config, base_dir, env).map_err(|e| match e {
            BuildError::Decoding { message, .. } => BuildError::Decoding {
                what: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Validate a decoded descriptor.
    ///
    /// Nothing is partially accepted: any malformed value fails the whole
    /// descriptor.
    pub fn from_config(
        config: BackendConfig,
        base_dir: PathBuf,
        env: &BackendEnv,
    ) -> Result<Self, BuildError> {
        let decoding = |message: String| BuildError::Decoding {
            what: format!("backend `{}`", config.name),
            message,
        };

        let mut downloads = Vec::with_capacity(config.downloads.len());
        for raw in &config.downloads {
            let url = Url::parse(raw).map_err(|e| decoding(format!("download `{}`: {}", raw, e)))?;
            downloads.push(url);
        }

        let mut packages = BTreeMap::new();
        for (name, spec) in &config.packages {
            packages.insert(name.clone(), PackageSource::from_spec(name, spec)?);
        }

        let wrapper_imports = config
            .wrapper_imports
            .iter()
            .map(|(name, import)| (name.parse::<XcodeTarget>().ok(), import.clone()))
            .collect();
        for platform in config.will_modify_main_swift.keys() {
            platform.parse::<XcodeTarget>().map_err(decoding)?;
        }

        let scripts = config
            .install
            .iter()
            .chain(&config.copy_to_site_packages)
            .chain(&config.modify_main_swift);
        for script in scripts {
            script.validate().map_err(decoding)?;
        }

        let support_dir = env.backend_support(&config.name);
        Ok(DescriptorBackend {
            config,
            base_dir,
            support_dir,
            downloads,
            packages,
            wrapper_imports,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn run(&self, scripts: &[ScriptConfig], cwd: &Path, env: &[(&str, String)]) -> Result<Vec<String>> {
        run_scripts(scripts, &self.base_dir, cwd, env)
    }
}

impl Backend for DescriptorBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn backend_dependencies(&self) -> Vec<String> {
        self.config.backend_dependencies.clone()
    }

    fn frameworks(&self) -> Vec<PathBuf> {
        self.config
            .frameworks
            .iter()
            .map(|f| {
                let p = Path::new(f);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    self.support_dir.join(p)
                }
            })
            .collect()
    }

    fn downloads(&self) -> Vec<Url> {
        self.downloads.clone()
    }

    fn packages(&self) -> Result<BTreeMap<String, PackageSource>> {
        Ok(self.packages.clone())
    }

    fn target_dependencies(&self, platform: XcodeTarget) -> Result<Vec<Dependency>> {
        Ok(self
            .config
            .target_dependencies
            .iter()
            .filter(|d| d.applies_to(platform))
            .cloned()
            .collect())
    }

    fn wrapper_imports(&self, platform: XcodeTarget) -> Result<Vec<WrapperImport>> {
        Ok(self
            .wrapper_imports
            .iter()
            .filter(|(scope, _)| scope.is_none() || *scope == Some(platform))
            .map(|(_, import)| import.clone())
            .collect())
    }

    fn wants_main_file_rewrite(&self) -> bool {
        self.config.will_modify_main_swift.values().any(|v| *v)
    }

    fn main_file_edits(
        &self,
        libraries: &[String],
        modules: &[String],
        platform: XcodeTarget,
    ) -> Result<Vec<CodeBlock>> {
        if self.config.modify_main_swift.is_empty() {
            return Ok(Vec::new());
        }
        let env = [
            ("PSPROJECT_PLATFORM", platform.to_string()),
            ("PSPROJECT_LIBRARIES", libraries.join(" ")),
            ("PSPROJECT_MODULES", modules.join(" ")),
        ];
        let outputs = self
            .run(&self.config.modify_main_swift, &self.base_dir, &env)
            .context("modify_main_swift script failed")?;
        Ok(outputs.into_iter().map(CodeBlock::main).collect())
    }

    fn plist_entries(&self, plist: &mut Plist, _platform: XcodeTarget) -> Result<()> {
        plist.merge(self.config.plist_entries.clone());
        Ok(())
    }

    fn install(&self, support: &Path, platform: XcodeTarget) -> Result<()> {
        if self.config.install.is_empty() {
            return Ok(());
        }
        let dest = support.join(&self.config.name);
        let marker = dest
            .join(".psproject")
            .join(format!("install-{}.done", platform));
        if marker.exists() {
            debug!("{}: install for {} already done", self.config.name, platform);
            return Ok(());
        }

        pfs::ensure_dir(&dest)?;
        let env = [
            ("PSPROJECT_PLATFORM", platform.to_string()),
            ("PSPROJECT_SUPPORT", dest.display().to_string()),
        ];
        self.run(&self.config.install, &dest, &env)
            .context("install script failed")?;
        pfs::write_string(&marker, "")?;
        Ok(())
    }

    fn copy_to_site_packages(
        &self,
        site_path: &Path,
        platform: XcodeTarget,
        wheel_platform: &str,
    ) -> Result<()> {
        if self.config.copy_to_site_packages.is_empty() {
            return Ok(());
        }
        let env = [
            ("PSPROJECT_PLATFORM", platform.to_string()),
            ("PSPROJECT_SITE_PACKAGES", site_path.display().to_string()),
            ("PSPROJECT_WHEEL_PLATFORM", wheel_platform.to_string()),
            ("PSPROJECT_SUPPORT", self.support_dir.display().to_string()),
        ];
        self.run(&self.config.copy_to_site_packages, site_path, &env)
            .context("copy_to_site_packages script failed")?;
        Ok(())
    }

    fn excluded_dependencies(&self) -> Result<Vec<String>> {
        Ok(self.config.exclude_dependencies.clone())
    }
}
