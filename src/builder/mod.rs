//! Native project assembly.
//!
//! Resolves platform contexts, merges backend contributions and writes the
//! project description.

pub mod aggregate;
pub mod assembler;
pub mod matrix;
pub mod target;
pub mod writer;

pub use aggregate::{DependencyAggregator, PackageSet};
pub use assembler::CodeBlockAssembler;
pub use matrix::{chunk_by_target, resolve_platforms};
pub use target::TargetBuilder;
pub use writer::{ProjectWriter, XcodeGenWriter};
