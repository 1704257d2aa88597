//! End-to-end tests of target generation and site-packages staging through
//! the library API.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tempfile::TempDir;

use psproject::backend::trait_def::BackendEnv;
use psproject::builder::matrix::{chunk_by_target, resolve_platforms};
use psproject::builder::target::TargetBuilder;
use psproject::core::dependency::DependencyKind;
use psproject::ops::requirements::LockfileTranslator;
use psproject::ops::site_packages::{InstallMode, InstallRequest, PackageInstaller, StagingOptions};
use psproject::ops::update::{update_site_packages_with, Toolchain};
use psproject::{BackendRegistry, GlobalContext, ProjectConfig, XcodeTarget};

const PYPROJECT: &str = r#"[project]
name = "kivy-demo"
dependencies = ["kivy"]

[tool.psproject]
app_name = "KivyDemo"
backends = ["kivylauncher"]
arch_info = "arm64"
extra_index = ["https://example.invalid/simple"]

[tool.psproject.ios]
extra_index = ["wheels"]
"#;

struct FixedExport(&'static str);

impl LockfileTranslator for FixedExport {
    fn export(&self, _project_root: &Path) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Installs a fake kivy tree, including parts the backend strips.
#[derive(Default)]
struct FakePip {
    requests: Mutex<Vec<(PathBuf, InstallMode, Vec<String>)>>,
}

impl PackageInstaller for FakePip {
    fn install(&self, request: &InstallRequest<'_>) -> Result<()> {
        self.requests.lock().unwrap().push((
            request.destination.to_path_buf(),
            request.mode.clone(),
            request.extra_index.to_vec(),
        ));
        let kivy = request.destination.join("kivy");
        std::fs::create_dir_all(kivy.join("tests"))?;
        std::fs::write(kivy.join("__init__.py"), "")?;
        std::fs::write(kivy.join("tests/test_app.py"), "")?;
        std::fs::write(kivy.join("_clock.cpython-313-darwin.so"), "")?;
        Ok(())
    }
}

fn project(tmp: &TempDir) -> ProjectConfig {
    std::fs::write(tmp.path().join("pyproject.toml"), PYPROJECT).unwrap();
    ProjectConfig::load(tmp.path()).unwrap()
}

fn registry(tmp: &TempDir, project: &ProjectConfig) -> BackendRegistry {
    let env = BackendEnv::new(tmp.path().join("shared/Support"), tmp.path().join("shared/backends"))
        .with_app_name(project.app_name())
        .with_platforms(project.platforms());
    BackendRegistry::from_names(&project.tool().backends, &env).unwrap()
}

#[test]
fn test_kivy_ios_arm64_contexts() {
    let tmp = TempDir::new().unwrap();
    let project = project(&tmp);

    let contexts = resolve_platforms(&project.platforms(), project.tool().arch_info, &project.working_dir());
    let names: Vec<String> = contexts.iter().map(|c| c.to_string()).collect();
    assert_eq!(names, vec!["iphoneos-arm64", "iphonesimulator-arm64"]);

    let chunks = chunk_by_target(&contexts);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].0, XcodeTarget::Ios);
}

#[test]
fn test_kivy_app_target() {
    let tmp = TempDir::new().unwrap();
    let project = project(&tmp);
    let registry = registry(&tmp, &project);

    let target = TargetBuilder::new(&project, &registry).app_target().unwrap();

    let deps: Vec<(&str, DependencyKind)> = target
        .dependencies
        .iter()
        .map(|d| (d.reference.as_str(), d.kind))
        .collect();
    assert_eq!(
        deps,
        vec![
            ("PySwiftKit", DependencyKind::Package),
            ("CPython", DependencyKind::Package),
            ("KivyLauncher", DependencyKind::Package),
        ]
    );
    assert!(target.main_files.is_empty());
    assert!(target.packages.contains_key("KivyLauncher"));

    let working = project.working_dir();
    let paths: Vec<String> = target.sources.iter().map(|s| s.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            "Resources/Images.xcassets".to_string(),
            working.join("Sources/IphoneOS").display().to_string(),
            working.join("Sources/Shared").display().to_string(),
            working.join("Sources").display().to_string(),
            "Resources/Launch Screen.storyboard".to_string(),
            working.join("Support/dylib-Info-template.plist").display().to_string(),
        ]
    );
    let groups: Vec<Option<&str>> = target.sources.iter().map(|s| s.group.as_deref()).collect();
    assert_eq!(
        groups,
        vec![
            Some("Resources"),
            Some("Sources"),
            Some("Sources"),
            Some("xcode"),
            Some("Resources"),
            Some("Support"),
        ]
    );
    assert_eq!(
        target.info.properties.get("UIRequiresFullScreen").and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn test_kivy_site_packages_staging() {
    let tmp = TempDir::new().unwrap();
    project(&tmp);
    let gctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_shared_dir(tmp.path().join("shared"));

    let translator = FixedExport("kivy==2.3.1\npillow==11.0\n");
    let installer = FakePip::default();
    let toolchain = Toolchain {
        translator: &translator,
        installer: &installer,
    };
    let options = StagingOptions {
        reset: true,
        ..Default::default()
    };
    let report = update_site_packages_with(&gctx, tmp.path(), &options, &toolchain).unwrap();
    assert!(report.is_success());
    assert_eq!(report.staged.len(), 2);

    let working = tmp.path().join("project_dist/xcode");
    let requirements = std::fs::read_to_string(working.join("requirements.txt")).unwrap();
    assert!(requirements.contains("kivy==2.3.1"));

    let device = working.join("site_packages.iphoneos");
    assert!(device.join("kivy/__init__.py").exists());
    assert!(!device.join("kivy/tests").exists());
    assert!(!device.join("kivy/_clock.cpython-313-darwin.so").exists());

    let requests = installer.requests.lock().unwrap();
    let (_, mode, indices) = requests
        .iter()
        .find(|(dest, _, _)| dest == &device)
        .unwrap();
    assert_eq!(
        *mode,
        InstallMode::Mobile {
            wheel_platform: "ios_13_0_arm64_iphoneos".to_string()
        }
    );
    assert_eq!(indices[0], "https://example.invalid/simple");
    assert!(indices[1].ends_with("/wheels"));
}
