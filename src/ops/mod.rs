//! High-level operations.
//!
//! This module contains the implementation of psproject commands.

pub mod cythonize;
pub mod generate;
pub mod provision;
pub mod requirements;
pub mod simple_index;
pub mod site_packages;
pub mod update;

pub use cythonize::cythonize_app;
pub use generate::{backend_env, generate, generate_with, GenerateResult};
pub use provision::{provision, ProvisionReport};
pub use requirements::{ExtraIndexList, LockfileTranslator, RequirementsGenerator, UvExport};
pub use simple_index::generate_simple_index;
pub use site_packages::{
    FailurePolicy, PackageInstaller, PipInstaller, SitePackagesPipeline, StagingOptions,
    StagingReport,
};
pub use update::{update_site_packages, update_site_packages_with, Toolchain};
