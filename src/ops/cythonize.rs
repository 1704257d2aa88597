//! Wheel builds for cythonized apps.
//!
//! A cythonized app ships as a binary wheel built by `cibuildwheel` per iOS
//! context; the post-build script installs it from `<root>/wheels`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::builder::matrix::resolve_platforms;
use crate::core::platform::PlatformContext;
use crate::core::project::ProjectConfig;
use crate::util::process::{find_executable, ProcessBuilder};

/// Directory under the project root receiving built wheels.
pub const WHEELS_DIR: &str = "wheels";

/// `cibuildwheel` invocation for one iOS context.
pub fn cibuildwheel_command(
    program: &Path,
    project_root: &Path,
    ctx: &PlatformContext,
) -> ProcessBuilder {
    ProcessBuilder::new(program)
        .args(["--platform", "ios", "--output-dir"])
        .arg(project_root.join(WHEELS_DIR))
        .env("CIBW_ARCHS", format!("{}_{}", ctx.arch(), ctx.sdk().wheel_name()))
        .cwd(project_root)
}

/// Build the app wheel for every iOS context.
///
/// Returns the contexts a wheel was built for. Projects that are not
/// cythonized, or have not been generated yet, are left alone.
pub fn cythonize_app(project: &ProjectConfig) -> Result<Vec<PlatformContext>> {
    if !project.tool().cythonized {
        info!("{} is not cythonized, nothing to build", project.name());
        return Ok(Vec::new());
    }
    let working_dir = project.working_dir();
    if !working_dir.is_dir() {
        info!(
            "{} does not exist yet, run `psproject generate` first",
            working_dir.display()
        );
        return Ok(Vec::new());
    }

    let program = find_executable("cibuildwheel")
        .context("`cibuildwheel` not found in PATH; install it to build cythonized apps")?;
    build_wheels(project, &program, &working_dir)
}

fn build_wheels(
    project: &ProjectConfig,
    program: &Path,
    working_dir: &Path,
) -> Result<Vec<PlatformContext>> {
    let mut built = Vec::new();
    for ctx in resolve_platforms(&project.platforms(), project.tool().arch_info, working_dir) {
        if ctx.is_desktop() {
            debug!("skipping wheel build for {}", ctx);
            continue;
        }
        info!("building app wheel for {}", ctx);
        cibuildwheel_command(program, project.root(), &ctx)
            .exec_and_check()
            .with_context(|| format!("failed to build app wheel for {}", ctx))?;
        built.push(ctx);
    }
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{HostArch, XcodeTarget};
    use tempfile::TempDir;

    #[test]
    fn test_cibuildwheel_command() {
        let root = Path::new("/work/demo");
        let contexts = resolve_platforms(&[XcodeTarget::Ios], HostArch::Intel64, root);
        let cmd = cibuildwheel_command(Path::new("cibuildwheel"), root, &contexts[1]);

        assert_eq!(cmd.get_env("CIBW_ARCHS"), Some("x86_64_iphonesimulator"));
        assert_eq!(cmd.get_cwd(), Some(root));
        assert_eq!(
            cmd.get_args(),
            &["--platform", "ios", "--output-dir", "/work/demo/wheels"]
        );
    }

    #[test]
    fn test_not_cythonized_is_noop() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectConfig::parse(
            tmp.path(),
            "[project]\nname = \"demo\"\n[tool.psproject]\n[tool.psproject.ios]\n",
        )
        .unwrap();
        assert!(cythonize_app(&project).unwrap().is_empty());
    }

    #[test]
    fn test_missing_working_dir_is_noop() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectConfig::parse(
            tmp.path(),
            "[project]\nname = \"demo\"\n[tool.psproject]\ncythonized = true\n[tool.psproject.ios]\n",
        )
        .unwrap();
        assert!(cythonize_app(&project).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_macos_contexts_skipped() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectConfig::parse(
            tmp.path(),
            "[project]\nname = \"demo\"\n[tool.psproject]\ncythonized = true\narch_info = \"arm64\"\n[tool.psproject.macos]\n",
        )
        .unwrap();
        let built = build_wheels(&project, Path::new("/bin/false"), tmp.path()).unwrap();
        assert!(built.is_empty());
    }
}
