//! Implementation of `psproject update site-packages`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::backend::registry::BackendRegistry;
use crate::builder::matrix::{chunk_by_target, resolve_platforms};
use crate::core::platform::XcodeTarget;
use crate::core::project::ProjectConfig;
use crate::ops::generate::{backend_env, extension_registries};
use crate::ops::requirements::{ExtraIndexList, LockfileTranslator, RequirementsGenerator, UvExport};
use crate::ops::site_packages::{
    ChunkManifest, PackageInstaller, PipInstaller, SitePackagesPipeline, StagingOptions,
    StagingReport,
};
use crate::util::context::GlobalContext;
use crate::util::fs as pfs;
use crate::util::process::find_python;

/// Collaborators used to stage site-packages.
pub struct Toolchain<'a> {
    pub translator: &'a dyn LockfileTranslator,
    pub installer: &'a dyn PackageInstaller,
}

/// Refresh every site-packages directory of the project using `uv` and
/// `pip`.
pub fn update_site_packages(
    gctx: &GlobalContext,
    project_root: &Path,
    options: &StagingOptions,
) -> Result<StagingReport> {
    let translator = UvExport::discover()?;
    let python = match &gctx.config().build.python {
        Some(python) => python.clone(),
        None => find_python().context("no python interpreter found; set [build] python")?,
    };
    let installer = PipInstaller::new(python);
    let toolchain = Toolchain {
        translator: &translator,
        installer: &installer,
    };
    update_site_packages_with(gctx, project_root, options, &toolchain)
}

/// Refresh site-packages with explicit collaborators.
///
/// The app target is staged under the working directory; each extension
/// target is staged under `<working dir>/<name>` with its own backends and
/// requirements manifest.
pub fn update_site_packages_with(
    gctx: &GlobalContext,
    project_root: &Path,
    options: &StagingOptions,
    toolchain: &Toolchain<'_>,
) -> Result<StagingReport> {
    let project = ProjectConfig::load(project_root)?;
    let env = backend_env(gctx, &project);
    let registry = BackendRegistry::from_names(&project.tool().backends, &env)?;
    let extensions = extension_registries(&project, &env)?;

    let working_dir = project.working_dir();
    let mut report = stage_target(
        &project,
        &registry,
        &project.platforms(),
        &working_dir,
        options,
        toolchain,
    )?;

    for (name, ext_registry) in &extensions {
        info!("updating site-packages for extension {}", name);
        let ext = stage_target(
            &project,
            ext_registry,
            &[XcodeTarget::Ios],
            &working_dir.join(name),
            options,
            toolchain,
        )?;
        report.staged.extend(ext.staged);
        report.failed.extend(ext.failed);
    }

    Ok(report)
}

fn stage_target(
    project: &ProjectConfig,
    registry: &BackendRegistry,
    platforms: &[XcodeTarget],
    root: &Path,
    options: &StagingOptions,
    toolchain: &Toolchain<'_>,
) -> Result<StagingReport> {
    let contexts = resolve_platforms(platforms, project.tool().arch_info, root);
    if contexts.is_empty() {
        warn!("nothing to build for {}", root.display());
        return Ok(StagingReport::default());
    }

    pfs::ensure_dir(root).with_context(|| format!("failed to create {}", root.display()))?;
    let requirements = RequirementsGenerator::new(toolchain.translator).write(project, registry, root)?;

    let chunks: Vec<ChunkManifest> = chunk_by_target(&contexts)
        .into_iter()
        .map(|(target, contexts)| ChunkManifest {
            target,
            contexts,
            requirements: requirements.clone(),
            extra_index: ExtraIndexList::for_target(project, target, project.root()),
        })
        .collect();

    let report = SitePackagesPipeline::new(toolchain.installer, registry, options.clone()).run(&chunks)?;
    info!(
        "staged {} of {} contexts under {}",
        report.staged.len(),
        contexts.len(),
        root.display()
    );
    Ok(report)
}
