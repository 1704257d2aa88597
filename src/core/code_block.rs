//! Generated source fragments for the program entry point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a fragment lands in the generated main file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePriority {
    Imports,
    PreMain,
    Main,
}

impl fmt::Display for CodePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CodePriority::Imports => "imports",
            CodePriority::PreMain => "pre_main",
            CodePriority::Main => "main",
        };
        write!(f, "{}", s)
    }
}

/// A source fragment with its priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub priority: CodePriority,
    pub code: String,
}

impl CodeBlock {
    pub fn new(priority: CodePriority, code: impl Into<String>) -> Self {
        CodeBlock {
            priority,
            code: code.into(),
        }
    }

    pub fn imports(code: impl Into<String>) -> Self {
        Self::new(CodePriority::Imports, code)
    }

    pub fn pre_main(code: impl Into<String>) -> Self {
        Self::new(CodePriority::PreMain, code)
    }

    pub fn main(code: impl Into<String>) -> Self {
        Self::new(CodePriority::Main, code)
    }
}

/// Native libraries and python modules a backend wraps for the interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperImport {
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
}

impl WrapperImport {
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty() && self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(CodePriority::Imports < CodePriority::PreMain);
        assert!(CodePriority::PreMain < CodePriority::Main);
        assert_eq!(CodePriority::PreMain.to_string(), "pre_main");
    }

    #[test]
    fn test_wrapper_import_decoding() {
        let w: WrapperImport = serde_json::from_str(r#"{"libraries": ["PyKivy"]}"#).unwrap();
        assert_eq!(w.libraries, vec!["PyKivy"]);
        assert!(w.modules.is_empty());
        assert!(!w.is_empty());
    }
}
