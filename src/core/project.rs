//! The `pyproject.toml` project description.
//!
//! Only `[project]` and `[tool.psproject]` are read; everything else in the
//! file is ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::errors::{BuildError, ConfigError};
use crate::core::platform::{HostArch, XcodeTarget};
use crate::core::plist::Plist;

/// Directory under the project root holding the generated native project.
pub const WORKING_DIR: &str = "project_dist/xcode";

#[derive(Debug, Deserialize)]
struct PyProjectFile {
    project: Option<ProjectTable>,
    tool: Option<ToolTable>,
}

#[derive(Debug, Deserialize)]
struct ProjectTable {
    name: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ToolTable {
    psproject: Option<PsProjectConfig>,
}

/// `[tool.psproject]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PsProjectConfig {
    pub app_name: Option<String>,
    #[serde(default)]
    pub backends: Vec<String>,
    #[serde(default)]
    pub extra_index: Vec<String>,
    #[serde(default)]
    pub arch_info: HostArch,
    #[serde(default)]
    pub cythonized: bool,
    pub ios: Option<PlatformSection>,
    pub macos: Option<PlatformSection>,
    #[serde(default)]
    pub plist: toml::Table,
    #[serde(default)]
    pub extra_targets: BTreeMap<String, ExtraTargetConfig>,
}

/// `[tool.psproject.ios]` / `[tool.psproject.macos]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformSection {
    #[serde(default)]
    pub extra_index: Vec<String>,
}

/// `[tool.psproject.extra_targets.<name>]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtraTargetConfig {
    #[serde(default)]
    pub backends: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<ExtraDependency>,
    #[serde(default)]
    pub info_plist: toml::Table,
    pub entitlements: Option<toml::Table>,
}

/// A package product an extension target links.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraDependency {
    pub package: PackageProducts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageProducts {
    pub reference: String,
    #[serde(default)]
    pub products: Vec<String>,
}

/// A loaded project.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    root: PathBuf,
    name: String,
    dependencies: Vec<String>,
    tool: PsProjectConfig,
}

impl ProjectConfig {
    /// Load `<root>/pyproject.toml`.
    pub fn load(root: &Path) -> Result<Self, BuildError> {
        let path = root.join("pyproject.toml");
        let text = std::fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        Self::parse(root, &text)
    }

    /// Parse pyproject text for a project rooted at `root`.
    pub fn parse(root: &Path, text: &str) -> Result<Self, BuildError> {
        let path = root.join("pyproject.toml");
        let file: PyProjectFile = toml::from_str(text).map_err(|e| BuildError::Decoding {
            what: path.display().to_string(),
            message: e.message().to_string(),
        })?;

        let tool = file
            .tool
            .and_then(|t| t.psproject)
            .ok_or_else(|| ConfigError::MissingSection {
                section: "tool.psproject".to_string(),
                path: path.clone(),
            })?;
        let project = file.project.ok_or_else(|| ConfigError::MissingSection {
            section: "project".to_string(),
            path,
        })?;

        Ok(ProjectConfig {
            root: root.to_path_buf(),
            name: project.name,
            dependencies: project.dependencies,
            tool,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pyproject_path(&self) -> PathBuf {
        self.root.join("pyproject.toml")
    }

    /// Python distribution name from `[project]`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn tool(&self) -> &PsProjectConfig {
        &self.tool
    }

    /// Display name of the app, defaulting to the project name.
    pub fn app_name(&self) -> &str {
        self.tool.app_name.as_deref().unwrap_or(&self.name)
    }

    /// Directory holding the generated native project.
    pub fn working_dir(&self) -> PathBuf {
        self.root.join(WORKING_DIR)
    }

    /// Platforms the project declares, iOS first.
    pub fn platforms(&self) -> Vec<XcodeTarget> {
        let mut out = Vec::new();
        if self.tool.ios.is_some() {
            out.push(XcodeTarget::Ios);
        }
        if self.tool.macos.is_some() {
            out.push(XcodeTarget::MacOs);
        }
        out
    }

    /// Project-level plist overrides.
    pub fn plist(&self) -> Plist {
        Plist::from_toml_table(&self.tool.plist)
    }

    /// Extra package indices scoped to one platform.
    pub fn platform_extra_index(&self, target: XcodeTarget) -> &[String] {
        let section = match target {
            XcodeTarget::Ios => self.tool.ios.as_ref(),
            XcodeTarget::MacOs => self.tool.macos.as_ref(),
            _ => None,
        };
        section.map(|s| s.extra_index.as_slice()).unwrap_or(&[])
    }
}
