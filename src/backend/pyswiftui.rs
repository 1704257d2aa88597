//! SwiftUI app backend.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::backend::trait_def::Backend;
use crate::core::code_block::CodeBlock;
use crate::core::dependency::Dependency;
use crate::core::package_source::PackageSource;
use crate::core::platform::XcodeTarget;

pub const SWIFTUI_ENGINE_URL: &str = "https://github.com/Py-Swift/SwiftUI_PyEngine";
pub const SWIFTUI_ENGINE_PACKAGE: &str = "SwiftUI_PyEngine";

/// Generates a SwiftUI `App` entry point in place of the default launcher.
#[derive(Debug, Clone)]
pub struct PySwiftUiBackend {
    app_name: String,
}

impl PySwiftUiBackend {
    pub fn new(app_name: impl Into<String>) -> Self {
        PySwiftUiBackend {
            app_name: app_name.into(),
        }
    }

    /// Swift type name of the generated app struct.
    fn app_type(&self) -> String {
        let ident: String = self
            .app_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        format!("{}App", ident)
    }
}

impl Backend for PySwiftUiBackend {
    fn name(&self) -> &str {
        "pyswiftui"
    }

    fn packages(&self) -> Result<BTreeMap<String, PackageSource>> {
        let source = PackageSource::remote_branch(SWIFTUI_ENGINE_URL, "main")?;
        Ok(BTreeMap::from([(SWIFTUI_ENGINE_PACKAGE.to_string(), source)]))
    }

    fn target_dependencies(&self, _platform: XcodeTarget) -> Result<Vec<Dependency>> {
        Ok(vec![Dependency::package(
            SWIFTUI_ENGINE_PACKAGE,
            [SWIFTUI_ENGINE_PACKAGE],
        )])
    }

    fn wants_main_file_rewrite(&self) -> bool {
        true
    }

    fn main_file_edits(
        &self,
        _libraries: &[String],
        _modules: &[String],
        _platform: XcodeTarget,
    ) -> Result<Vec<CodeBlock>> {
        let main = format!(
            "@main\n\
             struct {}: App {{\n\
             \x20   var body: some Scene {{\n\
             \x20       WindowGroup {{\n\
             \x20           Text(\"PySwiftUI\")\n\
             \x20       }}\n\
             \x20   }}\n\
             }}",
            self.app_type()
        );
        Ok(vec![
            CodeBlock::imports("import SwiftUI"),
            CodeBlock::pre_main(""),
            CodeBlock::main(main),
        ])
    }
}
