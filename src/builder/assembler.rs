//! Main-file assembly from backend code blocks.

use tracing::debug;

use crate::backend::registry::BackendRegistry;
use crate::core::code_block::{CodeBlock, WrapperImport};
use crate::core::errors::{BuildError, ConfigError};
use crate::core::platform::XcodeTarget;

/// Collects code blocks from every backend and orders them.
pub struct CodeBlockAssembler<'a> {
    registry: &'a BackendRegistry,
}

impl<'a> CodeBlockAssembler<'a> {
    pub fn new(registry: &'a BackendRegistry) -> Self {
        CodeBlockAssembler { registry }
    }

    /// Check the single main-file claimant rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let claimants: Vec<String> = self
            .registry
            .iter()
            .filter(|b| b.wants_main_file_rewrite())
            .map(|b| b.name().to_string())
            .collect();
        if claimants.len() > 1 {
            return Err(ConfigError::ConflictingMainFileRewrite {
                backends: claimants,
            });
        }
        Ok(())
    }

    /// Every backend's wrapper imports for `platform`, in registration order.
    pub fn wrapper_imports(&self, platform: XcodeTarget) -> Result<WrapperImport, BuildError> {
        let mut merged = WrapperImport::default();
        for backend in self.registry.iter() {
            let imports = backend
                .wrapper_imports(platform)
                .map_err(|e| BuildError::backend(backend.name(), Some(platform.to_string()), e))?;
            for import in imports {
                merged.libraries.extend(import.libraries);
                merged.modules.extend(import.modules);
            }
        }
        Ok(merged)
    }

    /// Ordered blocks for `platform`.
    ///
    /// Blocks are stably sorted by priority, so within one priority they
    /// keep registration order. Identical text is not de-duplicated.
    pub fn assemble(&self, platform: XcodeTarget) -> Result<Vec<CodeBlock>, BuildError> {
        self.validate()?;
        let imports = self.wrapper_imports(platform)?;

        let mut blocks = Vec::new();
        for backend in self.registry.iter() {
            let edits = backend
                .main_file_edits(&imports.libraries, &imports.modules, platform)
                .map_err(|e| BuildError::backend(backend.name(), Some(platform.to_string()), e))?;
            debug!("{}: {} code blocks for {}", backend.name(), edits.len(), platform);
            blocks.extend(edits);
        }
        blocks.sort_by_key(|b| b.priority);
        Ok(blocks)
    }

    /// Rendered main file for `platform`, or `None` when no backend claims
    /// the rewrite.
    pub fn render(&self, platform: XcodeTarget) -> Result<Option<String>, BuildError> {
        self.validate()?;
        if self.registry.main_file_claimant().is_none() {
            return Ok(None);
        }
        Ok(Some(render_blocks(&self.assemble(platform)?)))
    }
}

/// Join block texts with newlines.
pub fn render_blocks(blocks: &[CodeBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.code.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::trait_def::Backend;
    use crate::core::code_block::CodePriority;
    use anyhow::Result;

    struct Emitter {
        name: &'static str,
        claims: bool,
        blocks: Vec<CodeBlock>,
        modules: Vec<String>,
    }

    impl Emitter {
        fn new(name: &'static str, blocks: Vec<CodeBlock>) -> Self {
            Emitter {
                name,
                claims: false,
                blocks,
                modules: Vec::new(),
            }
        }
    }

    impl Backend for Emitter {
        fn name(&self) -> &str {
            self.name
        }

        fn wrapper_imports(&self, _platform: XcodeTarget) -> Result<Vec<WrapperImport>> {
            if self.modules.iter().any(|m| m.is_empty()) {
                anyhow::bail!("empty module name");
            }
            Ok(vec![WrapperImport {
                libraries: Vec::new(),
                modules: self.modules.clone(),
            }])
        }

        fn wants_main_file_rewrite(&self) -> bool {
            self.claims
        }

        fn main_file_edits(
            &self,
            _libraries: &[String],
            modules: &[String],
            _platform: XcodeTarget,
        ) -> Result<Vec<CodeBlock>> {
            let mut blocks = self.blocks.clone();
            if self.claims {
                blocks.push(CodeBlock::main(format!("// {}", modules.join(","))));
            }
            Ok(blocks)
        }
    }

    #[test]
    fn test_priority_then_registration_order() {
        let mut registry = BackendRegistry::new();
        registry
            .register(Box::new(Emitter::new(
                "a",
                vec![CodeBlock::main("a-main"), CodeBlock::imports("a-imp")],
            )))
            .unwrap();
        registry
            .register(Box::new(Emitter::new(
                "b",
                vec![CodeBlock::pre_main("b-pre"), CodeBlock::imports("b-imp")],
            )))
            .unwrap();

        let blocks = CodeBlockAssembler::new(&registry)
            .assemble(XcodeTarget::Ios)
            .unwrap();
        let codes: Vec<_> = blocks.iter().map(|b| b.code.as_str()).collect();
        assert_eq!(codes, vec!["a-imp", "b-imp", "b-pre", "a-main"]);
        assert_eq!(blocks[0].priority, CodePriority::Imports);
    }

    #[test]
    fn test_same_priority_follows_registration() {
        let order = |names: [&'static str; 2]| {
            let mut registry = BackendRegistry::new();
            for name in names {
                registry
                    .register(Box::new(Emitter::new(name, vec![CodeBlock::pre_main(name)])))
                    .unwrap();
            }
            CodeBlockAssembler::new(&registry)
                .assemble(XcodeTarget::Ios)
                .unwrap()
                .into_iter()
                .map(|b| b.code)
                .collect::<Vec<_>>()
        };
        assert_eq!(order(["first", "second"]), vec!["first", "second"]);
        assert_eq!(order(["second", "first"]), vec!["second", "first"]);
    }

    #[test]
    fn test_wrapper_import_failure_names_backend() {
        let mut registry = BackendRegistry::new();
        let mut broken = Emitter::new("broken", Vec::new());
        broken.modules = vec![String::new()];
        registry.register(Box::new(broken)).unwrap();

        let err = CodeBlockAssembler::new(&registry)
            .assemble(XcodeTarget::Ios)
            .unwrap_err();
        assert_eq!(err.backend_name(), Some("broken"));
        assert_eq!(err.platform(), Some("iOS"));
    }

    #[test]
    fn test_render_needs_claimant() {
        let mut registry = BackendRegistry::new();
        let mut plain = Emitter::new("plain", vec![CodeBlock::imports("import Foundation")]);
        plain.modules = vec!["kivy".into()];
        registry.register(Box::new(plain)).unwrap();
        assert_eq!(CodeBlockAssembler::new(&registry).render(XcodeTarget::Ios).unwrap(), None);

        let mut entry = Emitter::new("entry", Vec::new());
        entry.claims = true;
        registry.register(Box::new(entry)).unwrap();
        let rendered = CodeBlockAssembler::new(&registry)
            .render(XcodeTarget::Ios)
            .unwrap()
            .unwrap();
        assert_eq!(rendered, "import Foundation\n// kivy");
    }

    #[test]
    fn test_duplicate_text_kept() {
        let mut registry = BackendRegistry::new();
        registry
            .register(Box::new(Emitter::new("a", vec![CodeBlock::imports("import UIKit")])))
            .unwrap();
        registry
            .register(Box::new(Emitter::new("b", vec![CodeBlock::imports("import UIKit")])))
            .unwrap();
        let blocks = CodeBlockAssembler::new(&registry)
            .assemble(XcodeTarget::Ios)
            .unwrap();
        assert_eq!(blocks.len(), 2);
    }
}
