//! Backend provisioning.
//!
//! Fetches backend checkouts and declared downloads into the support
//! directory, then runs each backend's per-platform `install` hook.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backend::registry::BackendRegistry;
use crate::core::errors::BuildError;
use crate::core::platform::XcodeTarget;
use crate::util::download;

/// What provisioning found.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    /// Backends whose remote checkout was fetched in this run.
    pub fetched: Vec<String>,
    /// Declared downloads fetched in this run.
    pub downloaded: Vec<String>,
    /// Declared frameworks that do not exist after installation.
    pub missing_frameworks: Vec<PathBuf>,
}

/// Provision every backend for the given target classifications.
///
/// Remote checkouts and `downloads()` land in `<support>/<backend name>` and
/// are fetched at most once, for every backend before any `install` runs.
/// `install` then runs per backend and platform, in registration order.
pub fn provision(
    registry: &BackendRegistry,
    support: &Path,
    platforms: &[XcodeTarget],
) -> Result<ProvisionReport, BuildError> {
    let mut report = ProvisionReport::default();
    let mut declared = Vec::new();

    for backend in registry.iter() {
        let dest = support.join(backend.name());
        if let Some(url) = backend.remote_url() {
            let fetched = download::fetch_once(&url, &dest)
                .map_err(|e| BuildError::backend(backend.name(), None, e))?;
            if fetched {
                info!("fetched {} into {}", backend.name(), dest.display());
                report.fetched.push(backend.name().to_string());
            }
        }

        for url in backend.downloads() {
            let fetched = download::fetch_once(&url, &dest)
                .map_err(|e| BuildError::backend(backend.name(), None, e))?;
            if fetched {
                info!("{}: fetched {}", backend.name(), url);
                report.downloaded.push(url.to_string());
            }
        }

        declared.push((backend.name(), backend.frameworks()));
    }

    for backend in registry.iter() {
        for platform in platforms {
            debug!("installing {} for {}", backend.name(), platform);
            backend
                .install(support, *platform)
                .map_err(|e| BuildError::backend(backend.name(), Some(platform.to_string()), e))?;
        }
    }

    for (name, frameworks) in declared {
        for framework in frameworks {
            if !framework.exists() {
                warn!("{}: framework {} not found after install", name, framework.display());
                report.missing_frameworks.push(framework);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::trait_def::Backend;
    use crate::test_support::{CallLog, RecordingBackend};
    use tempfile::TempDir;
    use url::Url;

    struct Checkout {
        url: Url,
        framework: PathBuf,
    }

    impl Backend for Checkout {
        fn name(&self) -> &str {
            "checkout"
        }

        fn remote_url(&self) -> Option<Url> {
            Some(self.url.clone())
        }

        fn frameworks(&self) -> Vec<PathBuf> {
            vec![self.framework.clone()]
        }
    }

    #[test]
    fn test_install_per_platform_in_order() {
        let tmp = TempDir::new().unwrap();
        let log = CallLog::default();
        let mut registry = BackendRegistry::new();
        registry
            .register(Box::new(RecordingBackend::new("a", log.clone())))
            .unwrap();
        registry
            .register(Box::new(RecordingBackend::new("b", log.clone())))
            .unwrap();

        provision(&registry, tmp.path(), &[XcodeTarget::Ios, XcodeTarget::MacOs]).unwrap();
        assert_eq!(
            log.entries(),
            vec!["a:install:iOS", "a:install:macOS", "b:install:iOS", "b:install:macOS"]
        );
    }

    /// Fails `install` unless its download is already on disk.
    struct NeedsDownload {
        url: Url,
    }

    impl Backend for NeedsDownload {
        fn name(&self) -> &str {
            "needs-download"
        }

        fn downloads(&self) -> Vec<Url> {
            vec![self.url.clone()]
        }

        fn install(&self, support: &Path, _platform: XcodeTarget) -> anyhow::Result<()> {
            let expected = support.join("needs-download/resource.txt");
            if !expected.is_file() {
                anyhow::bail!("{} missing", expected.display());
            }
            Ok(())
        }
    }

    #[test]
    fn test_downloads_fetched_before_install() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("resource.txt");
        std::fs::write(&src, "payload").unwrap();
        let support = tmp.path().join("Support");
        let log = CallLog::default();

        let mut registry = BackendRegistry::new();
        registry
            .register(Box::new(RecordingBackend::new("early", log.clone())))
            .unwrap();
        registry
            .register(Box::new(NeedsDownload {
                url: Url::from_file_path(&src).unwrap(),
            }))
            .unwrap();

        let first = provision(&registry, &support, &[XcodeTarget::Ios]).unwrap();
        assert_eq!(first.downloaded.len(), 1);
        assert_eq!(log.entries(), vec!["early:install:iOS"]);

        let second = provision(&registry, &support, &[XcodeTarget::Ios]).unwrap();
        assert!(second.downloaded.is_empty());
    }

    #[test]
    fn test_failed_download_stops_before_install() {
        let tmp = TempDir::new().unwrap();
        let log = CallLog::default();
        let mut registry = BackendRegistry::new();
        registry
            .register(Box::new(RecordingBackend::new("early", log.clone())))
            .unwrap();
        registry
            .register(Box::new(NeedsDownload {
                url: Url::from_file_path(tmp.path().join("absent.txt")).unwrap(),
            }))
            .unwrap();

        let err = provision(&registry, &tmp.path().join("Support"), &[XcodeTarget::Ios]).unwrap_err();
        assert_eq!(err.backend_name(), Some("needs-download"));
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_remote_fetched_once_and_missing_framework_reported() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("Package.swift");
        std::fs::write(&src, "// swift-tools-version:5.9").unwrap();
        let support = tmp.path().join("Support");

        let mut registry = BackendRegistry::new();
        registry
            .register(Box::new(Checkout {
                url: Url::from_file_path(&src).unwrap(),
                framework: support.join("checkout/Missing.xcframework"),
            }))
            .unwrap();

        let first = provision(&registry, &support, &[XcodeTarget::Ios]).unwrap();
        assert_eq!(first.fetched, vec!["checkout"]);
        assert!(support.join("checkout/Package.swift").exists());
        assert_eq!(first.missing_frameworks.len(), 1);

        let second = provision(&registry, &support, &[XcodeTarget::Ios]).unwrap();
        assert!(second.fetched.is_empty());
    }
}
