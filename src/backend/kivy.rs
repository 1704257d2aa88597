//! Kivy launcher backends.
//!
//! `kivylauncher` targets Kivy 2.x and `kivy3launcher` the Kivy 3
//! development line. Both link the `KivyLauncher` Swift package and trim
//! the installed Kivy distribution.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::backend::trait_def::Backend;
use crate::core::dependency::Dependency;
use crate::core::package_source::PackageSource;
use crate::core::platform::XcodeTarget;
use crate::core::plist::Plist;
use crate::util::fs as pfs;
use crate::util::pyproject::PyProjectDocument;

pub const KIVY_LAUNCHER_URL: &str = "https://github.com/Py-Swift/KivyLauncher";
pub const KIVY_LAUNCHER_PACKAGE: &str = "KivyLauncher";

/// Directories of the installed `kivy` package that never ship in an app.
const STRIPPED_DIRS: &[&str] = &["kivy/tests", "kivy/tools"];

/// Kivy release line served by a launcher backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KivyFlavor {
    Kivy2,
    Kivy3,
}

impl KivyFlavor {
    fn backend_name(&self) -> &'static str {
        match self {
            KivyFlavor::Kivy2 => "kivylauncher",
            KivyFlavor::Kivy3 => "kivy3launcher",
        }
    }

    fn branch(&self) -> &'static str {
        match self {
            KivyFlavor::Kivy2 => "master",
            KivyFlavor::Kivy3 => "kivy3",
        }
    }

    fn requirement(&self) -> &'static str {
        match self {
            KivyFlavor::Kivy2 => "kivy",
            KivyFlavor::Kivy3 => "kivy>=3.0.0.dev0",
        }
    }
}

#[derive(Debug, Clone)]
pub struct KivyLauncherBackend {
    flavor: KivyFlavor,
}

impl KivyLauncherBackend {
    pub fn new(flavor: KivyFlavor) -> Self {
        KivyLauncherBackend { flavor }
    }

    pub fn flavor(&self) -> KivyFlavor {
        self.flavor
    }
}

impl Backend for KivyLauncherBackend {
    fn name(&self) -> &str {
        self.flavor.backend_name()
    }

    fn packages(&self) -> Result<BTreeMap<String, PackageSource>> {
        let source = PackageSource::remote_branch(KIVY_LAUNCHER_URL, self.flavor.branch())?;
        Ok(BTreeMap::from([(KIVY_LAUNCHER_PACKAGE.to_string(), source)]))
    }

    fn target_dependencies(&self, _platform: XcodeTarget) -> Result<Vec<Dependency>> {
        Ok(vec![Dependency::package(
            KIVY_LAUNCHER_PACKAGE,
            [KIVY_LAUNCHER_PACKAGE],
        )])
    }

    fn plist_entries(&self, plist: &mut Plist, platform: XcodeTarget) -> Result<()> {
        match platform {
            XcodeTarget::Ios => {
                plist.insert("UIRequiresFullScreen", true);
                plist.insert("UIStatusBarHidden", true);
            }
            XcodeTarget::MacOs => {
                plist.insert("NSHighResolutionCapable", true);
            }
            _ => {}
        }
        Ok(())
    }

    fn copy_to_site_packages(
        &self,
        site_path: &Path,
        platform: XcodeTarget,
        _wheel_platform: &str,
    ) -> Result<()> {
        let removed = pfs::remove_glob(site_path, STRIPPED_DIRS)?;
        for path in &removed {
            debug!("removed {}", path.display());
        }

        // Darwin extension modules cannot load on device.
        if platform == XcodeTarget::Ios {
            for path in pfs::find_files(site_path, |name| {
                name.ends_with(".so") && name.contains("-darwin")
            }) {
                std::fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
                debug!("removed {}", path.display());
            }
        }
        Ok(())
    }

    fn wants_pyproject_rewrite(&self) -> bool {
        true
    }

    fn pyproject_edits(&self, path: &Path) -> Result<()> {
        let mut doc = PyProjectDocument::load(path)?;
        if doc.ensure_dependency(self.flavor.requirement())? {
            doc.save()?;
        }
        Ok(())
    }
}
