//! Prebuilt CPython framework backend.
//!
//! Installs `Python.xcframework` from the BeeWare Python-Apple-support
//! releases. Each platform gets its own directory under the support root
//! so the iOS and macOS builds never overwrite each other. A framework only
//! appears in its final location once extraction and stripping succeeded.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tempfile::TempDir;
use tracing::{debug, info};
use url::Url;

use crate::backend::trait_def::Backend;
use crate::core::dependency::Dependency;
use crate::core::platform::XcodeTarget;
use crate::util::download;
use crate::util::fs as pfs;

pub const PYTHON_VERSION: &str = "3.13";
pub const SUPPORT_BUILD: &str = "b11";
pub const FRAMEWORK_NAME: &str = "Python.xcframework";

/// Files in the macOS framework that break code signing of the app bundle.
const MACOS_STRIPPED: &[&str] = &[
    "libpython3.13.dylib",
    "python3.13/config-3.13-darwin",
];
const MACOS_LIB_DIR: &str = "macos-arm64_x86_64/Python.framework/Versions/3.13/lib";

#[derive(Debug, Clone)]
pub struct PyFrameworkBackend {
    support_dir: PathBuf,
    platforms: Vec<XcodeTarget>,
}

impl PyFrameworkBackend {
    pub fn new(support_dir: impl Into<PathBuf>, platforms: Vec<XcodeTarget>) -> Self {
        PyFrameworkBackend {
            support_dir: support_dir.into(),
            platforms,
        }
    }

    /// Release tarball for `platform`, if one is published.
    pub fn release_url(platform: XcodeTarget) -> Option<Url> {
        let platform = match platform {
            XcodeTarget::Ios => "iOS",
            XcodeTarget::MacOs => "macOS",
            _ => return None,
        };
        let raw = format!(
            "https://github.com/beeware/Python-Apple-support/releases/download/{v}-{b}/Python-{v}-{p}-support.{b}.tar.gz",
            v = PYTHON_VERSION,
            b = SUPPORT_BUILD,
            p = platform
        );
        Url::parse(&raw).ok()
    }

    fn framework_dir(support: &Path, platform: XcodeTarget) -> PathBuf {
        support.join(platform.as_str()).join(FRAMEWORK_NAME)
    }

    /// Install the framework for `platform` from the release at `url`.
    ///
    /// The release is unpacked into a temporary directory beside the
    /// destination and renamed into place; a failed run leaves no framework.
    pub fn install_from(url: &Url, support: &Path, platform: XcodeTarget) -> Result<()> {
        let dest = support.join(platform.as_str());
        pfs::ensure_dir(&dest)?;
        let staging = TempDir::new_in(&dest)
            .with_context(|| format!("failed to create staging directory in {}", dest.display()))?;
        download::fetch_into(url, staging.path(), None)?;

        let extracted = staging.path().join(FRAMEWORK_NAME);
        if !extracted.is_dir() {
            bail!("{} does not contain {}", url, FRAMEWORK_NAME);
        }
        if platform == XcodeTarget::MacOs {
            strip_macos(&extracted)?;
        }

        let framework = dest.join(FRAMEWORK_NAME);
        std::fs::rename(&extracted, &framework).with_context(|| {
            format!("failed to move {} into {}", FRAMEWORK_NAME, dest.display())
        })?;
        Ok(())
    }
}

fn strip_macos(framework: &Path) -> Result<()> {
    let lib = framework.join(MACOS_LIB_DIR);
    for rel in MACOS_STRIPPED {
        let path = lib.join(rel);
        if path.is_dir() {
            pfs::remove_dir_all_if_exists(&path)?;
        } else if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

impl Backend for PyFrameworkBackend {
    fn name(&self) -> &str {
        "pyframework"
    }

    fn frameworks(&self) -> Vec<PathBuf> {
        self.platforms
            .iter()
            .filter(|p| Self::release_url(**p).is_some())
            .map(|p| Self::framework_dir(&self.support_dir, *p))
            .collect()
    }

    fn target_dependencies(&self, platform: XcodeTarget) -> Result<Vec<Dependency>> {
        if Self::release_url(platform).is_none() {
            return Ok(Vec::new());
        }
        let path = Self::framework_dir(&self.support_dir, platform);
        Ok(vec![
            Dependency::framework(path.display().to_string()).with_platform_filter(platform)
        ])
    }

    fn install(&self, support: &Path, platform: XcodeTarget) -> Result<()> {
        let Some(url) = Self::release_url(platform) else {
            debug!("no Python framework published for {}", platform);
            return Ok(());
        };
        let framework = Self::framework_dir(support, platform);
        if framework.exists() {
            debug!("{} already installed", framework.display());
            return Ok(());
        }

        info!("installing {} for {}", FRAMEWORK_NAME, platform);
        Self::install_from(&url, support, platform)
            .with_context(|| format!("failed to install Python framework for {}", platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::DependencyKind;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    /// Write a gzipped tarball with `entries` and return its URL.
    fn release(dir: &Path, entries: &[(&str, &str)]) -> Url {
        let encoder = GzEncoder::new(Vec::new(), Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        for (path, body) in entries {
            // Raw names, so entries like `../x` survive into the archive.
            let mut header = tar::Header::new_gnu();
            header.as_old_mut().name[..path.len()].copy_from_slice(path.as_bytes());
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, body.as_bytes()).unwrap();
        }
        let bytes = builder.into_inner().unwrap().finish().unwrap();
        let path = dir.join("Python-3.13-support.tar.gz");
        std::fs::write(&path, bytes).unwrap();
        Url::from_file_path(path).unwrap()
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_release_url() {
        let url = PyFrameworkBackend::release_url(XcodeTarget::Ios).unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.com/beeware/Python-Apple-support/releases/download/3.13-b11/Python-3.13-iOS-support.b11.tar.gz"
        );
        assert!(PyFrameworkBackend::release_url(XcodeTarget::TvOs).is_none());
    }

    #[test]
    fn test_frameworks_per_platform() {
        let backend = PyFrameworkBackend::new(
            "/shared/Support",
            vec![XcodeTarget::Ios, XcodeTarget::MacOs, XcodeTarget::VisionOs],
        );
        assert_eq!(
            backend.frameworks(),
            vec![
                PathBuf::from("/shared/Support/iOS/Python.xcframework"),
                PathBuf::from("/shared/Support/macOS/Python.xcframework"),
            ]
        );

        let deps = backend.target_dependencies(XcodeTarget::MacOs).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].kind, DependencyKind::Framework);
        assert_eq!(deps[0].platform_filter, Some(XcodeTarget::MacOs));
    }

    #[test]
    fn test_install_is_noop_when_framework_exists() {
        let tmp = TempDir::new().unwrap();
        let framework = tmp.path().join("iOS/Python.xcframework");
        std::fs::create_dir_all(&framework).unwrap();

        let backend = PyFrameworkBackend::new(tmp.path(), vec![XcodeTarget::Ios]);
        backend.install(tmp.path(), XcodeTarget::Ios).unwrap();
        assert!(framework.is_dir());
    }

    #[test]
    fn test_install_from_strips_macos_files() {
        let tmp = TempDir::new().unwrap();
        let lib = format!("Python.xcframework/{}", MACOS_LIB_DIR);
        let url = release(
            tmp.path(),
            &[
                ("Python.xcframework/Info.plist", "<plist/>"),
                (&format!("{}/libpython3.13.dylib", lib), "dylib"),
                (&format!("{}/python3.13/os.py", lib), "# os"),
                ("VERSIONS", "3.13"),
            ],
        );
        let support = tmp.path().join("Support");

        PyFrameworkBackend::install_from(&url, &support, XcodeTarget::MacOs).unwrap();
        let framework = support.join("macOS/Python.xcframework");
        assert!(framework.join("Info.plist").is_file());
        assert!(framework.join(MACOS_LIB_DIR).join("python3.13/os.py").is_file());
        assert!(!framework.join(MACOS_LIB_DIR).join("libpython3.13.dylib").exists());
        assert_eq!(leftovers(&support.join("macOS")), vec![FRAMEWORK_NAME]);
    }

    #[test]
    fn test_interrupted_extraction_leaves_no_framework() {
        let tmp = TempDir::new().unwrap();
        let support = tmp.path().join("Support");
        let broken = release(
            tmp.path(),
            &[
                ("Python.xcframework/Info.plist", "<plist/>"),
                ("../outside", "x"),
            ],
        );

        let err = PyFrameworkBackend::install_from(&broken, &support, XcodeTarget::Ios).unwrap_err();
        assert!(format!("{:#}", err).contains("escapes destination"));
        assert!(!support.join("iOS/Python.xcframework").exists());
        assert!(leftovers(&support.join("iOS")).is_empty());

        let good = release(tmp.path(), &[("Python.xcframework/Info.plist", "<plist/>")]);
        PyFrameworkBackend::install_from(&good, &support, XcodeTarget::Ios).unwrap();
        assert!(support.join("iOS/Python.xcframework/Info.plist").is_file());
    }
}
