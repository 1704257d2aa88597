//! Declarative backend descriptor schema.
//!
//! Descriptors are YAML, JSON or TOML documents living in
//! `<shared>/backends/<name>.<ext>`. Field names follow the descriptor
//! format exactly.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::script::ScriptConfig;
use crate::core::code_block::WrapperImport;
use crate::core::dependency::Dependency;
use crate::core::errors::BuildError;
use crate::core::package_source::PackageSpec;
use crate::core::plist::Plist;

/// Descriptor file extensions, in lookup order.
pub const DESCRIPTOR_EXTENSIONS: &[&str] = &["yml", "yaml", "json", "toml"];

/// A backend descriptor as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub name: String,
    #[serde(default)]
    pub backend_dependencies: Vec<String>,
    #[serde(default)]
    pub exclude_dependencies: Vec<String>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub target_dependencies: Vec<Dependency>,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageSpec>,
    /// Keyed by platform name (`iOS`, `macOS`, ...)
    #[serde(default)]
    pub wrapper_imports: BTreeMap<String, WrapperImport>,
    #[serde(default)]
    pub install: Vec<ScriptConfig>,
    #[serde(default)]
    pub copy_to_site_packages: Vec<ScriptConfig>,
    #[serde(default)]
    pub plist_entries: Plist,
    /// Keyed by platform name
    #[serde(default)]
    pub will_modify_main_swift: BTreeMap<String, bool>,
    #[serde(default)]
    pub modify_main_swift: Vec<ScriptConfig>,
}

impl BackendConfig {
    /// Decode a descriptor, choosing the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, BuildError> {
        let text = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self::from_str_with_format(&text, &ext).map_err(|message| BuildError::Decoding {
            what: path.display().to_string(),
            message,
        })
    }

    /// Decode descriptor text in the format named by `ext`.
    pub fn from_str_with_format(text: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "yml" | "yaml" => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(text).map_err(|e| e.to_string()),
            "toml" => toml::from_str(text).map_err(|e| e.to_string()),
            other => Err(format!("unsupported descriptor format `{}`", other)),
        }
    }
}
