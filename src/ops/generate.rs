//! Implementation of `psproject generate`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::backend::registry::BackendRegistry;
use crate::backend::trait_def::BackendEnv;
use crate::builder::target::{target_packages, TargetBuilder};
use crate::builder::writer::{ProjectWriter, XcodeGenWriter};
use crate::core::errors::BuildError;
use crate::core::platform::XcodeTarget;
use crate::core::project::ProjectConfig;
use crate::ops::provision::{provision, ProvisionReport};
use crate::util::context::GlobalContext;
use crate::util::fs as pfs;

/// Outcome of a generate run.
#[derive(Debug)]
pub struct GenerateResult {
    /// Project description written by the writer.
    pub project_file: PathBuf,
    /// Names of the generated targets, app first.
    pub targets: Vec<String>,
    pub provision: ProvisionReport,
}

/// Backend constructor environment for a project.
pub fn backend_env(gctx: &GlobalContext, project: &ProjectConfig) -> BackendEnv {
    BackendEnv::new(gctx.support_dir(), gctx.backends_dir())
        .with_app_name(project.app_name())
        .with_platforms(project.platforms())
}

/// Registries for the extension targets, in declaration order.
pub(crate) fn extension_registries(
    project: &ProjectConfig,
    env: &BackendEnv,
) -> Result<Vec<(String, BackendRegistry)>, BuildError> {
    let ext_env = env.clone().with_platforms(vec![XcodeTarget::Ios]);
    project
        .tool()
        .extra_targets
        .iter()
        .map(|(name, config)| -> Result<_, BuildError> {
            Ok((name.clone(), BackendRegistry::from_names(&config.backends, &ext_env)?))
        })
        .collect()
}

/// Generate the native project with the default writer.
pub fn generate(gctx: &GlobalContext, project_root: &Path) -> Result<GenerateResult> {
    generate_with(gctx, project_root, &XcodeGenWriter::new())
}

/// Generate the native project with `writer`.
///
/// Every backend is resolved and the native package definitions of every
/// target are checked before anything is written, so configuration errors
/// leave the project untouched.
pub fn generate_with(
    gctx: &GlobalContext,
    project_root: &Path,
    writer: &dyn ProjectWriter,
) -> Result<GenerateResult> {
    let mut project = ProjectConfig::load(project_root)?;
    let env = backend_env(gctx, &project);
    let registry = BackendRegistry::from_names(&project.tool().backends, &env)?;
    let extensions = extension_registries(&project, &env)?;
    target_packages(&registry)?;
    for (_, ext_registry) in &extensions {
        target_packages(ext_registry)?;
    }
    info!(
        "generating {} with backends [{}]",
        project.app_name(),
        registry.names().join(", ")
    );

    let pyproject = project.pyproject_path();
    let mut rewritten = false;
    for backend in registry.iter().filter(|b| b.wants_pyproject_rewrite()) {
        debug!("{} edits {}", backend.name(), pyproject.display());
        backend
            .pyproject_edits(&pyproject)
            .map_err(|e| BuildError::backend(backend.name(), None, e))?;
        rewritten = true;
    }
    if rewritten {
        project = ProjectConfig::load(project_root)?;
    }

    let working_dir = project.working_dir();
    pfs::ensure_dir(&working_dir)
        .with_context(|| format!("failed to create {}", working_dir.display()))?;
    for backend in registry.iter() {
        backend
            .configure(&working_dir)
            .map_err(|e| BuildError::backend(backend.name(), None, e))?;
    }

    let mut report = provision(&registry, &env.support_dir, &project.platforms())?;
    for (_, ext_registry) in &extensions {
        let ext = provision(ext_registry, &env.support_dir, &[XcodeTarget::Ios])?;
        report.fetched.extend(ext.fetched);
        report.missing_frameworks.extend(ext.missing_frameworks);
    }

    let builder = TargetBuilder::new(&project, &registry).with_working_dir(&working_dir);
    let mut targets = vec![builder.app_target()?];
    for (name, ext_registry) in &extensions {
        let config = &project.tool().extra_targets[name];
        targets.push(builder.extension_target(name, config, ext_registry)?);
    }

    let project_file = writer.write(&working_dir, project.app_name(), &targets)?;
    info!("generated {}", project_file.display());

    Ok(GenerateResult {
        project_file,
        targets: targets.into_iter().map(|t| t.name).collect(),
        provision: report,
    })
}
