//! Target descriptor generation.
//!
//! Combines the project description with every active backend's
//! contributions into the [`TargetDescriptor`]s handed to the project
//! writer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backend::registry::BackendRegistry;
use crate::builder::aggregate::{DependencyAggregator, PackageSet};
use crate::builder::assembler::CodeBlockAssembler;
use crate::core::dependency::Dependency;
use crate::core::errors::BuildError;
use crate::core::package_source::PackageSource;
use crate::core::platform::XcodeTarget;
use crate::core::plist::{Plist, PlistValue};
use crate::core::project::{ExtraTargetConfig, ProjectConfig};
use crate::core::target::{
    BuildScript, BuildSettings, PlistFile, TargetDescriptor, TargetKind, TargetSource,
};
use crate::util::fs as pfs;

pub const PYSWIFTKIT_URL: &str = "https://github.com/Py-Swift/PySwiftKit";
pub const CPYTHON_URL: &str = "https://github.com/Py-Swift/CPython";
pub const BASE_PACKAGE_VERSION: &str = "313.0.0";

/// Python minor version bundled into apps.
const PYTHON_MINOR: u32 = 13;

/// Packages every app links.
pub fn base_packages() -> Result<Vec<(&'static str, PackageSource)>, BuildError> {
    Ok(vec![
        (
            "PySwiftKit",
            PackageSource::remote_up_to_next_major(PYSWIFTKIT_URL, BASE_PACKAGE_VERSION)?,
        ),
        (
            "CPython",
            PackageSource::remote_up_to_next_major(CPYTHON_URL, BASE_PACKAGE_VERSION)?,
        ),
    ])
}

/// Native packages of a target: the base packages, then every backend's.
///
/// Conflicting definitions are a configuration error.
pub fn target_packages(
    registry: &BackendRegistry,
) -> Result<BTreeMap<String, PackageSource>, BuildError> {
    let mut set = PackageSet::new();
    for (name, source) in base_packages()? {
        set.insert("psproject", name, source)?;
    }
    set.collect(registry)?;
    Ok(set.into_map())
}

/// Build settings shared by Debug and Release.
pub fn default_settings() -> BuildSettings {
    let mut settings = BuildSettings::new();
    settings.insert(
        "LIBRARY_SEARCH_PATHS".to_string(),
        PlistValue::Array(vec![PlistValue::from("$(inherited)")]),
    );
    settings.insert("SWIFT_VERSION".to_string(), PlistValue::from("5.0"));
    settings.insert("ENABLE_BITCODE".to_string(), PlistValue::from(false));
    settings
}

fn base_plist(app_name: &str) -> Plist {
    let mut plist = Plist::new();
    plist.insert("CFBundleDevelopmentRegion", "$(DEVELOPMENT_LANGUAGE)");
    plist.insert("CFBundleDisplayName", app_name);
    plist.insert("CFBundleExecutable", "$(EXECUTABLE_NAME)");
    plist.insert("CFBundleIdentifier", "$(PRODUCT_BUNDLE_IDENTIFIER)");
    plist.insert("CFBundleInfoDictionaryVersion", "6.0");
    plist.insert("CFBundleName", "$(PRODUCT_NAME)");
    plist.insert("CFBundlePackageType", "$(PRODUCT_BUNDLE_PACKAGE_TYPE)");
    plist.insert("CFBundleShortVersionString", "1.0");
    plist.insert("CFBundleVersion", "1");
    plist.insert("UILaunchStoryboardName", "Launch Screen");
    plist
}

/// Builds the app target and any app extension targets.
pub struct TargetBuilder<'a> {
    project: &'a ProjectConfig,
    registry: &'a BackendRegistry,
    working_dir: PathBuf,
}

impl<'a> TargetBuilder<'a> {
    pub fn new(project: &'a ProjectConfig, registry: &'a BackendRegistry) -> Self {
        TargetBuilder {
            project,
            registry,
            working_dir: project.working_dir(),
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The application target.
    pub fn app_target(&self) -> Result<TargetDescriptor, BuildError> {
        let platforms = self.project.platforms();
        let mut target = TargetDescriptor::new(self.project.app_name(), TargetKind::Application);
        target.platforms = platforms.clone();
        target.settings = [
            ("Debug".to_string(), default_settings()),
            ("Release".to_string(), default_settings()),
        ]
        .into();
        target.sources = self.app_sources(&platforms);
        target.dependencies = self.app_dependencies(&platforms)?;
        target.packages = target_packages(self.registry)?;
        target.info = PlistFile {
            path: "Sources/Info.plist".to_string(),
            properties: self.app_plist(&platforms)?,
        };
        target.post_build_scripts = self.post_build_scripts();

        let assembler = CodeBlockAssembler::new(self.registry);
        for platform in &platforms {
            if let Some(main) = assembler.render(*platform)? {
                target.main_files.insert(*platform, main);
            }
        }

        debug!(
            "target {}: {} sources, {} dependencies, {} packages",
            target.name,
            target.sources.len(),
            target.dependencies.len(),
            target.packages.len()
        );
        Ok(target)
    }

    /// An iOS app extension target declared under `extra_targets`.
    pub fn extension_target(
        &self,
        name: &str,
        config: &ExtraTargetConfig,
        registry: &BackendRegistry,
    ) -> Result<TargetDescriptor, BuildError> {
        let mut target = TargetDescriptor::new(name, TargetKind::AppExtension);
        target.platforms = vec![XcodeTarget::Ios];
        target.product_name = self.project.tool().app_name.clone();
        target.settings = [
            ("Debug".to_string(), default_settings()),
            ("Release".to_string(), default_settings()),
        ]
        .into();

        target.sources = config
            .sources
            .iter()
            .map(|src| {
                let path = Path::new(src);
                let abs = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.project.root().join(path)
                };
                TargetSource::new(abs.display().to_string()).with_group(name)
            })
            .collect();

        let mut deps = DependencyAggregator::new();
        deps.add(Dependency::package("PySwiftKit", ["PySwiftKitBase"]));
        for dep in &config.dependencies {
            deps.add(Dependency::package(
                dep.package.reference.clone(),
                dep.package.products.clone(),
            ));
        }
        deps.collect(registry, &target.platforms)?;
        deps.exclude(&registry.excluded_dependencies()?);
        target.dependencies = deps.into_vec();
        target.packages = target_packages(registry)?;

        target.info = PlistFile {
            path: format!("{}/Info.plist", name),
            properties: Plist::from_toml_table(&config.info_plist),
        };
        target.entitlements = config.entitlements.as_ref().map(|table| PlistFile {
            path: format!("{}.entitlements", name),
            properties: Plist::from_toml_table(table),
        });
        Ok(target)
    }

    fn app_sources(&self, platforms: &[XcodeTarget]) -> Vec<TargetSource> {
        let sources_dir = self.working_dir.join("Sources");
        let source = |p: PathBuf| TargetSource::new(p.display().to_string());

        let mut sources = vec![TargetSource::new("Resources/Images.xcassets").with_group("Resources")];
        for platform in platforms {
            let dir = match platform {
                XcodeTarget::Ios => "IphoneOS",
                XcodeTarget::MacOs => "MacOS",
                _ => continue,
            };
            sources.push(
                source(sources_dir.join(dir))
                    .with_group("Sources")
                    .as_group()
                    .only_for(*platform),
            );
        }
        sources.push(source(sources_dir.join("Shared")).with_group("Sources").as_group());
        sources.push(
            source(sources_dir.clone())
                .with_group(pfs::file_name(&self.working_dir))
                .as_group(),
        );
        sources.push(
            TargetSource::new("Resources/Launch Screen.storyboard")
                .with_group("Resources")
                .only_for(XcodeTarget::Ios),
        );
        sources.push(
            source(self.working_dir.join("Support/dylib-Info-template.plist")).with_group("Support"),
        );
        sources
    }

    fn app_dependencies(&self, platforms: &[XcodeTarget]) -> Result<Vec<Dependency>, BuildError> {
        let mut deps = DependencyAggregator::new();
        deps.add(Dependency::package("PySwiftKit", ["PySwiftKitBase"]));
        deps.add(Dependency::package("CPython", ["CPython"]));
        deps.collect(self.registry, platforms)?;

        for backend in self.registry.iter() {
            for framework in backend.frameworks() {
                let reference = framework.display().to_string();
                if !deps.contains_reference(&reference) {
                    deps.add(Dependency::framework(reference));
                }
            }
        }
        deps.exclude(&self.registry.excluded_dependencies()?);
        Ok(deps.into_vec())
    }

    fn app_plist(&self, platforms: &[XcodeTarget]) -> Result<Plist, BuildError> {
        let mut plist = base_plist(self.project.app_name());
        for platform in platforms {
            for backend in self.registry.iter() {
                backend
                    .plist_entries(&mut plist, *platform)
                    .map_err(|e| BuildError::backend(backend.name(), Some(platform.to_string()), e))?;
            }
        }
        plist.merge(self.project.plist());
        Ok(plist)
    }

    fn post_build_scripts(&self) -> Vec<BuildScript> {
        let app_module = if self.project.tool().cythonized {
            install_app_wheel_script(self.project.name(), &self.project.root().join("wheels"))
        } else {
            install_app_script(&self.project.root().join("src"))
        };
        vec![
            app_module,
            install_site_packages_script(&self.working_dir),
            sign_python_script(PYTHON_MINOR),
        ]
    }
}

fn install_app_script(app_dir: &Path) -> BuildScript {
    BuildScript {
        name: "Install App Module".to_string(),
        script: format!(
            "mkdir -p \"$CODESIGNING_FOLDER_PATH/app\"\n\
             rsync -au --delete --exclude __pycache__ \"{}/\" \"$CODESIGNING_FOLDER_PATH/app/\"",
            app_dir.display()
        ),
    }
}

fn install_app_wheel_script(name: &str, wheels: &Path) -> BuildScript {
    BuildScript {
        name: "Install App Wheel".to_string(),
        script: format!(
            "python3 -m pip install --no-deps --upgrade \
             --target \"$CODESIGNING_FOLDER_PATH/app\" \
             --find-links \"{}\" \
             --platform \"ios_13_0_${{ARCHS}}_${{PLATFORM_NAME}}\" \
             --only-binary=:all: {}",
            wheels.display(),
            name
        ),
    }
}

fn install_site_packages_script(working_dir: &Path) -> BuildScript {
    BuildScript {
        name: "Install Python Modules".to_string(),
        script: format!(
            "case \"$PLATFORM_NAME\" in\n  macosx) SDK=macos ;;\n  *) SDK=\"$PLATFORM_NAME\" ;;\nesac\n\
             mkdir -p \"$CODESIGNING_FOLDER_PATH/site_packages\"\n\
             rsync -au --delete \"{}/site_packages.$SDK/\" \"$CODESIGNING_FOLDER_PATH/site_packages/\"",
            working_dir.display()
        ),
    }
}

fn sign_python_script(minor: u32) -> BuildScript {
    BuildScript {
        name: "Sign Python Binary".to_string(),
        script: format!(
            "if [ -n \"$EXPANDED_CODE_SIGN_IDENTITY\" ]; then\n\
             \x20 find \"$CODESIGNING_FOLDER_PATH\" \\( -name \"*.so\" -o -name \"*.dylib\" -o -name \"python3.{}\" \\) -type f \\\n\
             \x20   -exec /usr/bin/codesign --force --sign \"$EXPANDED_CODE_SIGN_IDENTITY\" --timestamp=none {{}} \\;\n\
             fi",
            minor
        ),
    }
}
