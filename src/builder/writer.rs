//! Native project description output.
//!
//! The default writer emits an XcodeGen `project.yml` next to the generated
//! sources. Turning that into an `.xcodeproj` is left to XcodeGen itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::package_source::{PackageSource, VersionSelector};
use crate::core::platform::XcodeTarget;
use crate::core::plist::Plist;
use crate::core::target::{BuildSettings, TargetDescriptor, TargetSource};
use crate::util::fs as pfs;

pub const PROJECT_SPEC_FILE: &str = "project.yml";

/// Writes target descriptors as a native project description.
pub trait ProjectWriter {
    /// Write the project rooted at `working_dir`; returns the main output
    /// file.
    fn write(
        &self,
        working_dir: &Path,
        project_name: &str,
        targets: &[TargetDescriptor],
    ) -> Result<PathBuf>;
}

/// Emits an XcodeGen project spec.
#[derive(Debug, Default, Clone)]
pub struct XcodeGenWriter;

impl XcodeGenWriter {
    pub fn new() -> Self {
        XcodeGenWriter
    }

    /// Render the project spec without touching the filesystem.
    pub fn render(
        &self,
        working_dir: &Path,
        project_name: &str,
        targets: &[TargetDescriptor],
    ) -> Result<String> {
        let mut packages = BTreeMap::new();
        for target in targets {
            for (name, source) in &target.packages {
                packages.insert(name.clone(), package_spec(source, working_dir));
            }
        }

        let spec = ProjectSpec {
            name: project_name.to_string(),
            packages,
            targets: targets
                .iter()
                .map(|t| (t.name.clone(), target_spec(t, working_dir)))
                .collect(),
        };
        serde_yaml::to_string(&spec).context("failed to serialize project spec")
    }
}

impl ProjectWriter for XcodeGenWriter {
    fn write(
        &self,
        working_dir: &Path,
        project_name: &str,
        targets: &[TargetDescriptor],
    ) -> Result<PathBuf> {
        for target in targets {
            for (platform, main) in &target.main_files {
                let dir = match platform {
                    XcodeTarget::MacOs => "MacOS",
                    _ => "IphoneOS",
                };
                let path = working_dir.join("Sources").join(dir).join("main.swift");
                pfs::write_string(&path, main)?;
            }
        }

        let text = self.render(working_dir, project_name, targets)?;
        let path = working_dir.join(PROJECT_SPEC_FILE);
        pfs::write_string(&path, &text)?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}

#[derive(Serialize)]
struct ProjectSpec {
    name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    packages: BTreeMap<String, PackageEntry>,
    targets: BTreeMap<String, TargetSpec>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct PackageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minor_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    major_version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetSpec {
    #[serde(rename = "type")]
    kind: &'static str,
    supported_destinations: Vec<XcodeTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_name: Option<String>,
    settings: SettingsSpec,
    sources: Vec<SourceSpec>,
    dependencies: Vec<DependencySpec>,
    info: PlistSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    entitlements: Option<PlistSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    post_build_scripts: Vec<ScriptSpec>,
}

#[derive(Serialize)]
struct SettingsSpec {
    configs: BTreeMap<String, BuildSettings>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceSpec {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    destination_filters: Vec<XcodeTarget>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DependencySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    framework: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    products: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform_filter: Option<XcodeTarget>,
}

#[derive(Serialize)]
struct PlistSpec {
    path: String,
    properties: Plist,
}

#[derive(Serialize)]
struct ScriptSpec {
    name: String,
    script: String,
}

/// Make absolute paths relative to the project spec location.
fn spec_path(path: &str, working_dir: &Path) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        pfs::relative_path(working_dir, p).display().to_string()
    } else {
        path.to_string()
    }
}

fn package_spec(source: &PackageSource, working_dir: &Path) -> PackageEntry {
    match source {
        PackageSource::Local { path } => PackageEntry {
            path: Some(spec_path(&path.display().to_string(), working_dir)),
            ..Default::default()
        },
        PackageSource::Remote { url, selector } => {
            let mut entry = PackageEntry {
                url: Some(url.to_string()),
                ..Default::default()
            };
            match selector {
                VersionSelector::Revision(r) => entry.revision = Some(r.clone()),
                VersionSelector::Branch(b) => entry.branch = Some(b.clone()),
                VersionSelector::ExactVersion(v) => entry.exact_version = Some(v.to_string()),
                VersionSelector::Range { minimum, maximum } => {
                    entry.min_version = Some(minimum.to_string());
                    entry.max_version = Some(maximum.to_string());
                }
                VersionSelector::UpToNextMinor(v) => entry.minor_version = Some(v.to_string()),
                VersionSelector::UpToNextMajor(v) => entry.major_version = Some(v.to_string()),
            }
            entry
        }
    }
}

fn source_spec(source: &TargetSource, working_dir: &Path) -> SourceSpec {
    SourceSpec {
        path: spec_path(&source.path, working_dir),
        group: source.group.clone(),
        kind: source.is_group.then_some("group"),
        destination_filters: source.destination_filters.clone(),
    }
}

fn dependency_spec(dep: &Dependency, working_dir: &Path) -> DependencySpec {
    let (package, framework) = match dep.kind {
        DependencyKind::Package => (Some(dep.reference.clone()), None),
        DependencyKind::Framework => (None, Some(spec_path(&dep.reference, working_dir))),
    };
    DependencySpec {
        package,
        framework,
        products: dep.products.clone(),
        platform_filter: dep.platform_filter,
    }
}

fn target_spec(target: &TargetDescriptor, working_dir: &Path) -> TargetSpec {
    TargetSpec {
        kind: target.kind.product_type(),
        supported_destinations: target.platforms.clone(),
        product_name: target.product_name.clone(),
        settings: SettingsSpec {
            configs: target.settings.clone(),
        },
        sources: target
            .sources
            .iter()
            .map(|s| source_spec(s, working_dir))
            .collect(),
        dependencies: target
            .dependencies
            .iter()
            .map(|d| dependency_spec(d, working_dir))
            .collect(),
        info: PlistSpec {
            path: target.info.path.clone(),
            properties: target.info.properties.clone(),
        },
        entitlements: target.entitlements.as_ref().map(|e| PlistSpec {
            path: e.path.clone(),
            properties: e.properties.clone(),
        }),
        post_build_scripts: target
            .post_build_scripts
            .iter()
            .map(|s| ScriptSpec {
                name: s.name.clone(),
                script: s.script.clone(),
            })
            .collect(),
    }
}
