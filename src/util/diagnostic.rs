//! User-facing diagnostic messages.
//!
//! Every reported error carries its root cause, the backend and platform
//! that were involved, and a suggested next step when one exists.

use std::error::Error as _;
use std::fmt;
use std::path::PathBuf;

use crate::core::errors::{BuildError, ConfigError};

/// Common suggestion messages.
pub mod suggestions {
    pub const NO_PYPROJECT: &str =
        "add a [tool.psproject] table to pyproject.toml or pass the project path";

    pub const LIST_BACKENDS: &str = "run `psproject backend list` to see available backends";

    pub const VERBOSE: &str = "re-run with `--verbose` for the full subprocess output";

    pub const BEST_EFFORT: &str =
        "pass `--best-effort` to stage the remaining platforms anyway";

    pub const RESET: &str = "pass `--reset` to rebuild the site-packages directory from scratch";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Build a diagnostic describing a build failure.
    pub fn from_build_error(err: &BuildError) -> Self {
        let mut diag = Diagnostic::error(err.to_string());

        if let Some(backend) = err.backend_name() {
            diag = diag.with_context(format!("backend: {}", backend));
        }
        if let Some(platform) = err.platform() {
            diag = diag.with_context(format!("platform: {}", platform));
        }

        let mut cause = err.source();
        while let Some(inner) = cause {
            diag = diag.with_context(format!("caused by: {}", inner));
            cause = inner.source();
        }

        match err {
            BuildError::Configuration(ConfigError::MissingSection { path, .. }) => diag
                .with_location(path.clone())
                .with_suggestion(suggestions::NO_PYPROJECT),
            BuildError::Configuration(ConfigError::UnknownBackend { .. }) => {
                diag.with_suggestion(suggestions::LIST_BACKENDS)
            }
            BuildError::Configuration(_) => diag,
            BuildError::Install { .. } => diag
                .with_suggestion(suggestions::VERBOSE)
                .with_suggestion(suggestions::BEST_EFFORT),
            BuildError::Backend { .. } => diag
                .with_suggestion(suggestions::VERBOSE)
                .with_suggestion(suggestions::RESET),
            BuildError::Io { path, .. } => diag.with_location(path.clone()),
            BuildError::Decoding { .. } => diag,
        }
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let severity_str = match (color, self.severity) {
            (true, Severity::Error) => "\x1b[1;31merror\x1b[0m".to_string(),
            (true, Severity::Warning) => "\x1b[1;33mwarning\x1b[0m".to_string(),
            (false, s) => s.to_string(),
        };

        let mut output = format!("{}: {}\n", severity_str, self.message);

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help_prefix = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_failure_diagnostic() {
        let err = BuildError::backend(
            "kivylauncher",
            Some("iphoneos-arm64".to_string()),
            anyhow::anyhow!("permission denied"),
        );
        let output = Diagnostic::from_build_error(&err).format(false);
        assert!(output.starts_with("error: backend `kivylauncher` failed on iphoneos-arm64"));
        assert!(output.contains("= platform: iphoneos-arm64"));
        assert!(output.contains("caused by: permission denied"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_unknown_backend_suggests_listing() {
        let err: BuildError = ConfigError::UnknownBackend {
            name: "kivy4".into(),
            known: None,
        }
        .into();
        let output = Diagnostic::from_build_error(&err).format(false);
        assert!(output.contains("psproject backend list"));
    }

    #[test]
    fn test_warning_format() {
        let diag = Diagnostic::warning("framework missing").with_location("/s/Python.xcframework");
        let output = diag.format(false);
        assert!(output.starts_with("warning: framework missing"));
        assert!(output.contains("--> /s/Python.xcframework"));
    }
}
