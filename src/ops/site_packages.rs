//! Per-platform site-packages staging.
//!
//! Each context is processed in three steps: prepare the directory
//! (optionally emptying it), run the package installer, then let every
//! backend post-process the result in registration order.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::backend::registry::BackendRegistry;
use crate::core::errors::BuildError;
use crate::core::platform::{PlatformContext, XcodeTarget};
use crate::ops::requirements::ExtraIndexList;
use crate::util::fs as pfs;
use crate::util::process::ProcessBuilder;

/// How the installer treats wheels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMode {
    /// Native wheels for the running host.
    Desktop,
    /// Binary wheels for a foreign platform tag.
    Mobile { wheel_platform: String },
}

/// One installer invocation.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    pub requirements: &'a Path,
    pub destination: &'a Path,
    pub extra_index: &'a [String],
    pub mode: InstallMode,
    /// Working directory of the installer process.
    pub cwd: &'a Path,
}

/// Installs requirements into a directory.
pub trait PackageInstaller: Send + Sync {
    fn install(&self, request: &InstallRequest<'_>) -> Result<()>;
}

/// `python -m pip install --target`.
#[derive(Debug, Clone)]
pub struct PipInstaller {
    python: PathBuf,
}

impl PipInstaller {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        PipInstaller {
            python: python.into(),
        }
    }

    pub fn command(&self, request: &InstallRequest<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.python)
            .args(["-m", "pip", "install", "--disable-pip-version-check", "--upgrade"])
            .arg("--target")
            .arg(request.destination)
            .arg("-r")
            .arg(request.requirements);
        for index in request.extra_index {
            cmd = cmd.arg("--extra-index-url").arg(index);
        }
        if let InstallMode::Mobile { wheel_platform } = &request.mode {
            cmd = cmd
                .arg("--platform")
                .arg(wheel_platform)
                .arg("--only-binary=:all:");
        }
        cmd.cwd(request.cwd)
    }
}

impl PackageInstaller for PipInstaller {
    fn install(&self, request: &InstallRequest<'_>) -> Result<()> {
        self.command(request).exec_and_check()?;
        Ok(())
    }
}

/// What happens when one context fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the build on the first failure.
    #[default]
    FailFast,
    /// Record the failure and continue with the remaining contexts.
    BestEffort,
}

#[derive(Debug, Clone, Default)]
pub struct StagingOptions {
    pub reset: bool,
    pub policy: FailurePolicy,
    pub parallel: bool,
}

/// Requirements and indices shared by the contexts of one target.
#[derive(Debug, Clone)]
pub struct ChunkManifest {
    pub target: XcodeTarget,
    pub contexts: Vec<PlatformContext>,
    pub requirements: PathBuf,
    pub extra_index: ExtraIndexList,
}

/// Outcome of a staging run.
#[derive(Debug, Default)]
pub struct StagingReport {
    pub staged: Vec<PlatformContext>,
    pub failed: Vec<(PlatformContext, BuildError)>,
}

impl StagingReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct SitePackagesPipeline<'a> {
    installer: &'a dyn PackageInstaller,
    registry: &'a BackendRegistry,
    options: StagingOptions,
}

impl<'a> SitePackagesPipeline<'a> {
    pub fn new(
        installer: &'a dyn PackageInstaller,
        registry: &'a BackendRegistry,
        options: StagingOptions,
    ) -> Self {
        SitePackagesPipeline {
            installer,
            registry,
            options,
        }
    }

    /// Stage one context.
    pub fn stage(
        &self,
        ctx: &PlatformContext,
        requirements: &Path,
        extra_index: &ExtraIndexList,
    ) -> Result<(), BuildError> {
        let site = ctx.site_packages();
        if self.options.reset {
            pfs::reset_dir(&site).map_err(|e| BuildError::io(&site, e))?;
        } else {
            pfs::ensure_dir(&site).map_err(|e| BuildError::io(&site, e))?;
        }

        let wheel_platform = ctx.wheel_platform();
        let mode = if ctx.is_desktop() {
            InstallMode::Desktop
        } else {
            InstallMode::Mobile {
                wheel_platform: wheel_platform.clone(),
            }
        };
        info!("installing site-packages for {}", ctx);
        self.installer
            .install(&InstallRequest {
                requirements,
                destination: &site,
                extra_index: extra_index.as_slice(),
                mode,
                cwd: ctx.root(),
            })
            .map_err(|e| BuildError::install(ctx, e))?;

        for backend in self.registry.iter() {
            backend
                .copy_to_site_packages(&site, ctx.target(), &wheel_platform)
                .map_err(|e| BuildError::backend(backend.name(), Some(ctx.to_string()), e))?;
        }
        Ok(())
    }

    /// Stage every context of every chunk.
    pub fn run(&self, chunks: &[ChunkManifest]) -> Result<StagingReport, BuildError> {
        let jobs: Vec<(&PlatformContext, &ChunkManifest)> = chunks
            .iter()
            .flat_map(|chunk| chunk.contexts.iter().map(move |ctx| (ctx, chunk)))
            .collect();

        let mut report = StagingReport::default();
        if self.options.parallel {
            let results: Vec<Result<(), BuildError>> = jobs
                .par_iter()
                .map(|(ctx, chunk)| self.stage(ctx, &chunk.requirements, &chunk.extra_index))
                .collect();
            for ((ctx, _), result) in jobs.iter().zip(results) {
                self.record(&mut report, ctx, result)?;
            }
        } else {
            for (ctx, chunk) in &jobs {
                let result = self.stage(ctx, &chunk.requirements, &chunk.extra_index);
                self.record(&mut report, ctx, result)?;
            }
        }
        Ok(report)
    }

    fn record(
        &self,
        report: &mut StagingReport,
        ctx: &PlatformContext,
        result: Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        match result {
            Ok(()) => report.staged.push(ctx.clone()),
            Err(e) => match self.options.policy {
                FailurePolicy::FailFast => return Err(e),
                FailurePolicy::BestEffort => {
                    warn!("{}: {}", ctx, e.chain_message());
                    report.failed.push((ctx.clone(), e));
                }
            },
        }
        Ok(())
    }
}
