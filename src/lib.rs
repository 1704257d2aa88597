//! psproject - configures and stages native app targets that embed CPython
//!
//! This crate provides the core library functionality for psproject,
//! including the backend protocol, platform matrix resolution, target
//! generation and site-packages staging.

pub mod backend;
pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Recording mocks for psproject unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides stand-ins for the lockfile translator, the package installer
/// and backends.
#[cfg(test)]
pub mod test_support;

pub use backend::{Backend, BackendRegistry};
pub use core::{
    errors::{BuildError, ConfigError},
    platform::{PlatformContext, XcodeTarget},
    project::ProjectConfig,
    target::TargetDescriptor,
};
pub use util::context::GlobalContext;
