//! Native package sources.
//!
//! `PackageSpec` is the schema form backends declare; `PackageSource` is the
//! validated form. A remote source must carry exactly one version selector.

use std::fmt;
use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::ConfigError;

/// Version range for a remote package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRange {
    pub minimum_version: String,
    pub maximum_version: String,
}

/// Legacy single-key version requirement.
///
/// Decodes from exactly one of `{branch = ..}`, `{version = ..}`,
/// `{revision = ..}`; any other shape is a decoding error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionRequirement {
    Branch(String),
    Version(String),
    Revision(String),
}

/// Package declaration as written in backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<VersionRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to_next_minor_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to_next_major_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_requirement: Option<VersionRequirement>,
}

/// How a remote package version is pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Revision(String),
    Branch(String),
    ExactVersion(Version),
    Range { minimum: Version, maximum: Version },
    UpToNextMinor(Version),
    UpToNextMajor(Version),
}

/// A validated package source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    Remote { url: Url, selector: VersionSelector },
    Local { path: PathBuf },
}

impl PackageSource {
    /// Remote package pinned to a branch.
    pub fn remote_branch(url: &str, branch: impl Into<String>) -> Result<Self, ConfigError> {
        let url = parse_url(url, url)?;
        Ok(PackageSource::Remote {
            url,
            selector: VersionSelector::Branch(branch.into()),
        })
    }

    /// Remote package following the next major version.
    pub fn remote_up_to_next_major(url: &str, from: &str) -> Result<Self, ConfigError> {
        Ok(PackageSource::Remote {
            url: parse_url(url, url)?,
            selector: VersionSelector::UpToNextMajor(parse_version(url, from)?),
        })
    }

    pub fn is_local(&self) -> bool {
        matches!(self, PackageSource::Local { .. })
    }

    /// Validate a declared package.
    pub fn from_spec(name: &str, spec: &PackageSpec) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPackageSource {
            package: name.to_string(),
            reason: reason.to_string(),
        };

        let mut selectors: Vec<(&'static str, VersionSelector)> = Vec::new();
        if let Some(rev) = &spec.revision {
            selectors.push(("revision", VersionSelector::Revision(rev.clone())));
        }
        if let Some(branch) = &spec.branch {
            selectors.push(("branch", VersionSelector::Branch(branch.clone())));
        }
        if let Some(v) = &spec.exact_version {
            selectors.push(("exactVersion", VersionSelector::ExactVersion(parse_version(name, v)?)));
        }
        if let Some(range) = &spec.version_range {
            let minimum = parse_version(name, &range.minimum_version)?;
            let maximum = parse_version(name, &range.maximum_version)?;
            if minimum >= maximum {
                return Err(invalid("versionRange minimum must be lower than maximum"));
            }
            selectors.push(("versionRange", VersionSelector::Range { minimum, maximum }));
        }
        if let Some(v) = &spec.up_to_next_minor_version {
            selectors.push((
                "upToNextMinorVersion",
                VersionSelector::UpToNextMinor(parse_version(name, v)?),
            ));
        }
        if let Some(v) = &spec.up_to_next_major_version {
            selectors.push((
                "upToNextMajorVersion",
                VersionSelector::UpToNextMajor(parse_version(name, v)?),
            ));
        }
        if let Some(req) = &spec.version_requirement {
            let selector = match req {
                VersionRequirement::Branch(b) => VersionSelector::Branch(b.clone()),
                VersionRequirement::Version(v) => {
                    VersionSelector::ExactVersion(parse_version(name, v)?)
                }
                VersionRequirement::Revision(r) => VersionSelector::Revision(r.clone()),
            };
            selectors.push(("versionRequirement", selector));
        }

        match (&spec.url, &spec.path) {
            (Some(_), Some(_)) => Err(invalid("both url and path are set")),
            (None, None) => Err(invalid("neither url nor path is set")),
            (None, Some(path)) => {
                if !selectors.is_empty() {
                    return Err(invalid("a local package cannot declare a version selector"));
                }
                Ok(PackageSource::Local {
                    path: PathBuf::from(path),
                })
            }
            (Some(url), None) => {
                let url = parse_url(name, url)?;
                if selectors.len() > 1 {
                    return Err(ConfigError::AmbiguousPackageSource {
                        package: name.to_string(),
                        selectors: selectors.iter().map(|(key, _)| *key).collect(),
                    });
                }
                match selectors.pop() {
                    Some((_, selector)) => Ok(PackageSource::Remote { url, selector }),
                    None => Err(invalid("remote package has no version selector")),
                }
            }
        }
    }

    /// Convert back to the schema form.
    pub fn to_spec(&self) -> PackageSpec {
        match self {
            PackageSource::Local { path } => PackageSpec {
                path: Some(path.display().to_string()),
                ..Default::default()
            },
            PackageSource::Remote { url, selector } => {
                let mut spec = PackageSpec {
                    url: Some(url.to_string()),
                    ..Default::default()
                };
                match selector {
                    VersionSelector::Revision(r) => spec.revision = Some(r.clone()),
                    VersionSelector::Branch(b) => spec.branch = Some(b.clone()),
                    VersionSelector::ExactVersion(v) => spec.exact_version = Some(v.to_string()),
                    VersionSelector::Range { minimum, maximum } => {
                        spec.version_range = Some(VersionRange {
                            minimum_version: minimum.to_string(),
                            maximum_version: maximum.to_string(),
                        })
                    }
                    VersionSelector::UpToNextMinor(v) => {
                        spec.up_to_next_minor_version = Some(v.to_string())
                    }
                    VersionSelector::UpToNextMajor(v) => {
                        spec.up_to_next_major_version = Some(v.to_string())
                    }
                }
                spec
            }
        }
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSource::Local { path } => write!(f, "path {}", path.display()),
            PackageSource::Remote { url, selector } => match selector {
                VersionSelector::Revision(r) => write!(f, "{} @ {}", url, r),
                VersionSelector::Branch(b) => write!(f, "{} (branch {})", url, b),
                VersionSelector::ExactVersion(v) => write!(f, "{} ={}", url, v),
                VersionSelector::Range { minimum, maximum } => {
                    write!(f, "{} >={}, <{}", url, minimum, maximum)
                }
                VersionSelector::UpToNextMinor(v) => write!(f, "{} ~{}", url, v),
                VersionSelector::UpToNextMajor(v) => write!(f, "{} ^{}", url, v),
            },
        }
    }
}

fn parse_url(package: &str, url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|e| ConfigError::InvalidPackageSource {
        package: package.to_string(),
        reason: format!("invalid url '{}': {}", url, e),
    })
}

/// Parse a package version, accepting `1` and `1.2` shorthands.
fn parse_version(package: &str, raw: &str) -> Result<Version, ConfigError> {
    let trimmed = raw.trim();
    let padded = match trimmed.split('.').count() {
        1 => format!("{}.0.0", trimmed),
        2 => format!("{}.0", trimmed),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).map_err(|e| ConfigError::InvalidPackageSource {
        package: package.to_string(),
        reason: format!("invalid version '{}': {}", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(url: &str) -> PackageSpec {
        PackageSpec {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_selector_accepted() {
        let mut spec = remote("https://github.com/Py-Swift/PySwiftKit");
        spec.up_to_next_major_version = Some("311.0".to_string());
        let source = PackageSource::from_spec("PySwiftKit", &spec).unwrap();
        match source {
            PackageSource::Remote { selector, .. } => {
                assert_eq!(selector, VersionSelector::UpToNextMajor(Version::new(311, 0, 0)));
            }
            _ => panic!("expected remote"),
        }
    }

    #[test]
    fn test_ambiguous_selectors_rejected() {
        let mut spec = remote("https://example.com/pkg");
        spec.branch = Some("main".to_string());
        spec.exact_version = Some("1.0.0".to_string());
        let err = PackageSource::from_spec("pkg", &spec).unwrap_err();
        match err {
            ConfigError::AmbiguousPackageSource { selectors, .. } => {
                assert_eq!(selectors, vec!["branch", "exactVersion"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_selector_rejected() {
        let spec = remote("https://example.com/pkg");
        assert!(matches!(
            PackageSource::from_spec("pkg", &spec),
            Err(ConfigError::InvalidPackageSource { .. })
        ));
    }

    #[test]
    fn test_version_requirement_counts_as_selector() {
        let mut spec = remote("https://example.com/pkg");
        spec.version_requirement = Some(VersionRequirement::Revision("abc123".into()));
        assert!(PackageSource::from_spec("pkg", &spec).is_ok());

        spec.branch = Some("main".into());
        assert!(matches!(
            PackageSource::from_spec("pkg", &spec),
            Err(ConfigError::AmbiguousPackageSource { .. })
        ));
    }

    #[test]
    fn test_version_requirement_decoding() {
        let req: VersionRequirement = serde_json::from_str(r#"{"branch": "main"}"#).unwrap();
        assert_eq!(req, VersionRequirement::Branch("main".into()));
        assert!(serde_json::from_str::<VersionRequirement>(r#"{"tag": "v1"}"#).is_err());
    }

    #[test]
    fn test_local_source() {
        let spec = PackageSpec {
            path: Some("../SwiftUI_PyEngine".into()),
            ..Default::default()
        };
        let source = PackageSource::from_spec("engine", &spec).unwrap();
        assert!(source.is_local());
        assert_eq!(source.to_spec(), spec);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut spec = remote("https://example.com/pkg");
        spec.version_range = Some(VersionRange {
            minimum_version: "2.0.0".into(),
            maximum_version: "1.0.0".into(),
        });
        assert!(PackageSource::from_spec("pkg", &spec).is_err());
    }
}
