//! Core data structures for psproject.
//!
//! - Platform identifiers and resolved build contexts
//! - Native dependencies and package sources
//! - Property lists, code blocks and target descriptors
//! - The project description and the error taxonomy

pub mod code_block;
pub mod dependency;
pub mod errors;
pub mod package_source;
pub mod platform;
pub mod plist;
pub mod project;
pub mod target;

pub use code_block::{CodeBlock, CodePriority, WrapperImport};
pub use dependency::{Dependency, DependencyKind};
pub use errors::{BuildError, ConfigError};
pub use package_source::{PackageSource, PackageSpec};
pub use platform::{Arch, HostArch, PlatformContext, Sdk, XcodeTarget};
pub use plist::{Plist, PlistValue};
pub use project::ProjectConfig;
pub use target::{TargetDescriptor, TargetKind};
