//! Error taxonomy for a build invocation.
//!
//! Configuration errors are raised before anything touches the filesystem.
//! Everything a backend hook or collaborator reports is wrapped so the user
//! can see which backend and which platform context broke.

use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Boxed cause carried by failure variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error for build operations.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigError),

    #[error("backend `{backend}` failed{}", on_platform(.platform))]
    #[diagnostic(code(psproject::backend::failed))]
    Backend {
        backend: String,
        platform: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("package install failed for {platform}")]
    #[diagnostic(code(psproject::install::failed))]
    Install {
        platform: String,
        #[source]
        source: BoxError,
    },

    #[error("I/O failure at {}", .path.display())]
    #[diagnostic(code(psproject::io))]
    Io {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to decode {what}: {message}")]
    #[diagnostic(code(psproject::decode))]
    Decoding { what: String, message: String },
}

fn on_platform(platform: &Option<String>) -> String {
    match platform {
        Some(p) => format!(" on {}", p),
        None => String::new(),
    }
}

impl BuildError {
    /// Wrap a backend hook failure.
    pub fn backend(backend: &str, platform: Option<String>, err: anyhow::Error) -> Self {
        BuildError::Backend {
            backend: backend.to_string(),
            platform,
            source: err.into(),
        }
    }

    /// Wrap an installer failure for a platform context.
    pub fn install(platform: impl ToString, err: anyhow::Error) -> Self {
        BuildError::Install {
            platform: platform.to_string(),
            source: err.into(),
        }
    }

    /// Wrap an I/O failure at a path.
    pub fn io(path: &Path, err: impl Into<BoxError>) -> Self {
        BuildError::Io {
            path: path.to_path_buf(),
            source: err.into(),
        }
    }

    /// Name of the backend responsible for this error, if any.
    pub fn backend_name(&self) -> Option<&str> {
        match self {
            BuildError::Backend { backend, .. } => Some(backend),
            _ => None,
        }
    }

    /// Platform context string attached to this error, if any.
    pub fn platform(&self) -> Option<&str> {
        match self {
            BuildError::Backend { platform, .. } => platform.as_deref(),
            BuildError::Install { platform, .. } => Some(platform),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, BuildError::Configuration(_))
    }

    /// This error and its causes on one line.
    pub fn chain_message(&self) -> String {
        let mut msg = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        msg
    }
}

/// Fatal configuration errors.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigError {
    #[error("missing `{section}` section in {}", .path.display())]
    #[diagnostic(
        code(psproject::config::missing_section),
        help("add a [tool.psproject] table to pyproject.toml")
    )]
    MissingSection { section: String, path: PathBuf },

    #[error("unknown backend `{name}`")]
    #[diagnostic(code(psproject::config::unknown_backend))]
    UnknownBackend {
        name: String,
        #[help]
        known: Option<String>,
    },

    #[error("package `{package}` declares more than one version selector: {}", .selectors.join(", "))]
    #[diagnostic(
        code(psproject::config::ambiguous_source),
        help("keep exactly one of revision, branch, exactVersion, versionRange, upToNextMinorVersion, upToNextMajorVersion")
    )]
    AmbiguousPackageSource {
        package: String,
        selectors: Vec<&'static str>,
    },

    #[error("package `{package}` has no usable source: {reason}")]
    #[diagnostic(code(psproject::config::invalid_source))]
    InvalidPackageSource { package: String, reason: String },

    #[error("package `{package}` is defined differently by `{first}` and `{second}`")]
    #[diagnostic(code(psproject::config::conflicting_package))]
    ConflictingPackage {
        package: String,
        first: String,
        second: String,
    },

    #[error("more than one backend rewrites the main file: {}", .backends.join(", "))]
    #[diagnostic(
        code(psproject::config::main_file_claim),
        help("only one active backend may generate the program entry point")
    )]
    ConflictingMainFileRewrite { backends: Vec<String> },

    #[error("backend dependency cycle: {}", .chain.join(" -> "))]
    #[diagnostic(code(psproject::config::backend_cycle))]
    BackendCycle { chain: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BuildError::backend(
            "kivylauncher",
            Some("iphoneos-arm64".to_string()),
            anyhow::anyhow!("boom"),
        );
        assert_eq!(err.to_string(), "backend `kivylauncher` failed on iphoneos-arm64");
        assert_eq!(err.backend_name(), Some("kivylauncher"));
        assert_eq!(err.platform(), Some("iphoneos-arm64"));

        let err = BuildError::backend("pyswiftui", None, anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "backend `pyswiftui` failed");
        assert_eq!(err.chain_message(), "backend `pyswiftui` failed: boom");
    }

    #[test]
    fn test_config_error_is_configuration() {
        let err: BuildError = ConfigError::ConflictingMainFileRewrite {
            backends: vec!["a".into(), "b".into()],
        }
        .into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("a, b"));
    }
}
