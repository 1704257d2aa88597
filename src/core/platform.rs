//! Platform identifiers and resolved build contexts.
//!
//! A [`PlatformContext`] is one concrete (architecture, SDK, root) unit that
//! gets its own site-packages directory. Contexts are only produced by the
//! platform matrix resolver in `builder::matrix`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Minimum iOS version encoded in iOS wheel tags.
pub const IOS_WHEEL_MIN_VERSION: &str = "13_0";

/// Minimum macOS version encoded in macOS wheel tags.
pub const MACOS_WHEEL_MIN_VERSION: &str = "11_0";

/// Xcode target classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum XcodeTarget {
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "macOS")]
    MacOs,
    #[serde(rename = "tvOS")]
    TvOs,
    #[serde(rename = "watchOS")]
    WatchOs,
    #[serde(rename = "visionOS")]
    VisionOs,
    #[serde(rename = "auto")]
    Auto,
}

impl XcodeTarget {
    /// Get the Xcode spelling of this target.
    pub fn as_str(&self) -> &'static str {
        match self {
            XcodeTarget::Ios => "iOS",
            XcodeTarget::MacOs => "macOS",
            XcodeTarget::TvOs => "tvOS",
            XcodeTarget::WatchOs => "watchOS",
            XcodeTarget::VisionOs => "visionOS",
            XcodeTarget::Auto => "auto",
        }
    }

    /// Desktop targets install native wheels directly.
    pub fn is_desktop(&self) -> bool {
        matches!(self, XcodeTarget::MacOs)
    }
}

impl fmt::Display for XcodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for XcodeTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(XcodeTarget::Ios),
            "macos" => Ok(XcodeTarget::MacOs),
            "tvos" => Ok(XcodeTarget::TvOs),
            "watchos" => Ok(XcodeTarget::WatchOs),
            "visionos" => Ok(XcodeTarget::VisionOs),
            "auto" => Ok(XcodeTarget::Auto),
            _ => Err(format!(
                "invalid platform '{}', valid values: iOS, macOS, tvOS, watchOS, visionOS, auto",
                s
            )),
        }
    }
}

/// CPU architecture of a build context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Arm64,
    X86_64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// SDK a context builds against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sdk {
    IphoneOs,
    IphoneSimulator,
    MacOs,
}

impl Sdk {
    /// Name used in wheel tags and site-packages folder names.
    pub fn wheel_name(&self) -> &'static str {
        match self {
            Sdk::IphoneOs => "iphoneos",
            Sdk::IphoneSimulator => "iphonesimulator",
            Sdk::MacOs => "macos",
        }
    }

    /// Target classification governing this SDK.
    pub fn target(&self) -> XcodeTarget {
        match self {
            Sdk::IphoneOs | Sdk::IphoneSimulator => XcodeTarget::Ios,
            Sdk::MacOs => XcodeTarget::MacOs,
        }
    }
}

impl fmt::Display for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wheel_name())
    }
}

/// Host architecture preference (`arch_info` in the project config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostArch {
    Intel64,
    Arm64,
    #[default]
    Auto,
}

impl HostArch {
    /// Architecture selected by this preference, if any.
    pub fn arch(&self) -> Option<Arch> {
        match self {
            HostArch::Intel64 => Some(Arch::X86_64),
            HostArch::Arm64 => Some(Arch::Arm64),
            HostArch::Auto => None,
        }
    }
}

impl std::str::FromStr for HostArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intel64" | "x86_64" => Ok(HostArch::Intel64),
            "arm64" | "aarch64" => Ok(HostArch::Arm64),
            "auto" => Ok(HostArch::Auto),
            _ => Err(format!(
                "invalid host architecture '{}', valid values: intel64, arm64, auto",
                s
            )),
        }
    }
}

/// A fully resolved build context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformContext {
    arch: Arch,
    sdk: Sdk,
    root: PathBuf,
}

impl PlatformContext {
    pub(crate) fn new(arch: Arch, sdk: Sdk, root: &Path) -> Self {
        PlatformContext {
            arch,
            sdk,
            root: root.to_path_buf(),
        }
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn sdk(&self) -> Sdk {
        self.sdk
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target classification used for chunking.
    pub fn target(&self) -> XcodeTarget {
        self.sdk.target()
    }

    /// Whether the installer runs in desktop mode for this context.
    pub fn is_desktop(&self) -> bool {
        self.target().is_desktop()
    }

    /// Wheel platform tag handed to the package installer.
    pub fn wheel_platform(&self) -> String {
        match self.sdk {
            Sdk::IphoneOs | Sdk::IphoneSimulator => format!(
                "ios_{}_{}_{}",
                IOS_WHEEL_MIN_VERSION,
                self.arch,
                self.sdk.wheel_name()
            ),
            Sdk::MacOs => format!("macosx_{}_{}", MACOS_WHEEL_MIN_VERSION, self.arch),
        }
    }

    /// Destination site-packages directory for this context.
    pub fn site_packages(&self) -> PathBuf {
        self.root
            .join(format!("site_packages.{}", self.sdk.wheel_name()))
    }
}

impl fmt::Display for PlatformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.sdk, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_platform_tags() {
        let root = Path::new("/proj/xcode");
        let device = PlatformContext::new(Arch::Arm64, Sdk::IphoneOs, root);
        assert_eq!(device.wheel_platform(), "ios_13_0_arm64_iphoneos");

        let sim = PlatformContext::new(Arch::X86_64, Sdk::IphoneSimulator, root);
        assert_eq!(sim.wheel_platform(), "ios_13_0_x86_64_iphonesimulator");

        let mac = PlatformContext::new(Arch::Arm64, Sdk::MacOs, root);
        assert_eq!(mac.wheel_platform(), "macosx_11_0_arm64");
    }

    #[test]
    fn test_site_packages_path() {
        let ctx = PlatformContext::new(Arch::Arm64, Sdk::IphoneSimulator, Path::new("/p"));
        assert_eq!(
            ctx.site_packages(),
            PathBuf::from("/p/site_packages.iphonesimulator")
        );
        assert_eq!(ctx.target(), XcodeTarget::Ios);
        assert!(!ctx.is_desktop());
        assert_eq!(ctx.to_string(), "iphonesimulator-arm64");
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!("iOS".parse::<XcodeTarget>().unwrap(), XcodeTarget::Ios);
        assert_eq!("macos".parse::<XcodeTarget>().unwrap(), XcodeTarget::MacOs);
        assert!("android".parse::<XcodeTarget>().is_err());
        assert_eq!("intel64".parse::<HostArch>().unwrap(), HostArch::Intel64);
        assert_eq!(HostArch::Auto.arch(), None);
    }
}
