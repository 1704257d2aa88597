//! Native target descriptors handed to the project writer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::dependency::Dependency;
use crate::core::package_source::PackageSource;
use crate::core::platform::XcodeTarget;
use crate::core::plist::{Plist, PlistValue};

/// Build settings for one configuration (`Debug`, `Release`).
pub type BuildSettings = BTreeMap<String, PlistValue>;

/// Kind of native target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    Application,
    AppExtension,
}

impl TargetKind {
    /// XcodeGen product type.
    pub fn product_type(&self) -> &'static str {
        match self {
            TargetKind::Application => "application",
            TargetKind::AppExtension => "app-extension",
        }
    }
}

/// A source folder or file of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSource {
    pub path: String,
    pub group: Option<String>,
    /// Added as a group folder rather than a folder reference.
    pub is_group: bool,
    pub destination_filters: Vec<XcodeTarget>,
}

impl TargetSource {
    pub fn new(path: impl Into<String>) -> Self {
        TargetSource {
            path: path.into(),
            group: None,
            is_group: false,
            destination_filters: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn as_group(mut self) -> Self {
        self.is_group = true;
        self
    }

    pub fn only_for(mut self, platform: XcodeTarget) -> Self {
        self.destination_filters.push(platform);
        self
    }
}

/// A shell build phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScript {
    pub name: String,
    pub script: String,
}

/// A generated property-list file.
#[derive(Debug, Clone, PartialEq)]
pub struct PlistFile {
    pub path: String,
    pub properties: Plist,
}

/// Everything the project writer needs to emit one target.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    pub name: String,
    pub kind: TargetKind,
    pub platforms: Vec<XcodeTarget>,
    pub product_name: Option<String>,
    pub settings: BTreeMap<String, BuildSettings>,
    pub sources: Vec<TargetSource>,
    pub dependencies: Vec<Dependency>,
    pub packages: BTreeMap<String, PackageSource>,
    pub info: PlistFile,
    pub entitlements: Option<PlistFile>,
    pub post_build_scripts: Vec<BuildScript>,
    /// Rendered entry point per platform, when a backend rewrites it.
    pub main_files: BTreeMap<XcodeTarget, String>,
}

impl TargetDescriptor {
    /// Descriptor with no content.
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        TargetDescriptor {
            name: name.into(),
            kind,
            platforms: Vec::new(),
            product_name: None,
            settings: BTreeMap::new(),
            sources: Vec::new(),
            dependencies: Vec::new(),
            packages: BTreeMap::new(),
            info: PlistFile {
                path: "Sources/Info.plist".to_string(),
                properties: Plist::new(),
            },
            entitlements: None,
            post_build_scripts: Vec::new(),
            main_files: BTreeMap::new(),
        }
    }
}
