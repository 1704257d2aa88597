//! Native target dependencies.
//!
//! A Dependency is what a backend asks the generated app target to link:
//! either a framework on disk or a product of a native package.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::platform::XcodeTarget;

/// Kind of a target dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// A framework referenced by path
    Framework,
    /// A product of a native package
    Package,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Framework => write!(f, "framework"),
            DependencyKind::Package => write!(f, "package"),
        }
    }
}

/// A dependency of the generated app target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Dependency kind
    #[serde(rename = "type")]
    pub kind: DependencyKind,

    /// Package name or framework path
    pub reference: String,

    /// Products linked from the package
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,

    /// Restrict linking to one platform
    #[serde(
        default,
        rename = "platformFilter",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_filter: Option<XcodeTarget>,
}

impl Dependency {
    /// Create a package product dependency.
    pub fn package<I, S>(reference: impl Into<String>, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dependency {
            kind: DependencyKind::Package,
            reference: reference.into(),
            products: products.into_iter().map(Into::into).collect(),
            platform_filter: None,
        }
    }

    /// Create a framework dependency.
    pub fn framework(reference: impl Into<String>) -> Self {
        Dependency {
            kind: DependencyKind::Framework,
            reference: reference.into(),
            products: Vec::new(),
            platform_filter: None,
        }
    }

    /// Restrict this dependency to one platform.
    pub fn with_platform_filter(mut self, platform: XcodeTarget) -> Self {
        self.platform_filter = Some(platform);
        self
    }

    /// Key used for set-union aggregation.
    pub fn key(&self) -> (DependencyKind, &str, &[String]) {
        (self.kind, &self.reference, &self.products)
    }

    /// Whether this dependency applies to `platform`.
    pub fn applies_to(&self, platform: XcodeTarget) -> bool {
        self.platform_filter.map_or(true, |p| p == platform)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.reference)?;
        if !self.products.is_empty() {
            write!(f, " [{}]", self.products.join(", "))?;
        }
        Ok(())
    }
}
