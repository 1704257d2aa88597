//! Backend registry - resolves backend names into instances for one build.
//!
//! Built-in names map to native backends. Any other name is looked up as a
//! descriptor file in the shared backends directory. Backends named in
//! `backend_dependencies` are registered before their dependents.

use std::path::PathBuf;

use tracing::debug;

use crate::backend::descriptor::DescriptorBackend;
use crate::backend::kivy::{KivyFlavor, KivyLauncherBackend};
use crate::backend::pyframework::PyFrameworkBackend;
use crate::backend::pyswiftui::PySwiftUiBackend;
use crate::backend::schema::DESCRIPTOR_EXTENSIONS;
use crate::backend::trait_def::{Backend, BackendEnv};
use crate::core::errors::{BuildError, ConfigError};

/// Identifier of a built-in backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    KivyLauncher,
    Kivy3Launcher,
    PySwiftUi,
    PyFramework,
}

impl BackendId {
    pub fn all() -> &'static [BackendId] {
        &[
            BackendId::KivyLauncher,
            BackendId::Kivy3Launcher,
            BackendId::PySwiftUi,
            BackendId::PyFramework,
        ]
    }

    /// Get the backend name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::KivyLauncher => "kivylauncher",
            BackendId::Kivy3Launcher => "kivy3launcher",
            BackendId::PySwiftUi => "pyswiftui",
            BackendId::PyFramework => "pyframework",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BackendId::KivyLauncher => "Kivy 2 launcher package and site-packages cleanup",
            BackendId::Kivy3Launcher => "Kivy 3 launcher package and site-packages cleanup",
            BackendId::PySwiftUi => "SwiftUI entry point driven by SwiftUI_PyEngine",
            BackendId::PyFramework => "prebuilt Python.xcframework from Python-Apple-support",
        }
    }

    fn instantiate(&self, env: &BackendEnv) -> Box<dyn Backend> {
        match self {
            BackendId::KivyLauncher => Box::new(KivyLauncherBackend::new(KivyFlavor::Kivy2)),
            BackendId::Kivy3Launcher => Box::new(KivyLauncherBackend::new(KivyFlavor::Kivy3)),
            BackendId::PySwiftUi => Box::new(PySwiftUiBackend::new(env.app_name.clone())),
            BackendId::PyFramework => Box::new(PyFrameworkBackend::new(
                env.support_dir.clone(),
                env.platforms.clone(),
            )),
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendId {
    type Err = BackendIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kivylauncher" => Ok(BackendId::KivyLauncher),
            "kivy3launcher" => Ok(BackendId::Kivy3Launcher),
            "pyswiftui" => Ok(BackendId::PySwiftUi),
            "pyframework" => Ok(BackendId::PyFramework),
            _ => Err(BackendIdParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid backend ID.
#[derive(Debug, Clone)]
pub struct BackendIdParseError(pub String);

impl std::fmt::Display for BackendIdParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid backend ID '{}', valid values: kivylauncher, kivy3launcher, pyswiftui, pyframework",
            self.0
        )
    }
}

impl std::error::Error for BackendIdParseError {}

/// Locate the descriptor file for a non-built-in backend.
pub fn find_descriptor(env: &BackendEnv, name: &str) -> Option<PathBuf> {
    DESCRIPTOR_EXTENSIONS
        .iter()
        .map(|ext| env.backends_dir.join(format!("{}.{}", name, ext)))
        .find(|p| p.is_file())
}

/// Ordered set of active backends for one build invocation.
///
/// Registration order is significant: every hook is called in this order,
/// and later backends may override plist keys set by earlier ones.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        BackendRegistry {
            backends: Vec::new(),
        }
    }

    /// Resolve `names` and their backend dependencies.
    ///
    /// Fails before anything touches the filesystem on an unknown name, a
    /// dependency cycle, a malformed descriptor or a second main-file
    /// claimant.
    pub fn from_names(names: &[String], env: &BackendEnv) -> Result<Self, BuildError> {
        let mut registry = BackendRegistry::new();
        let mut stack = Vec::new();
        for name in names {
            registry.resolve(name, env, &mut stack)?;
        }
        debug!("active backends: {}", registry.names().join(", "));
        Ok(registry)
    }

    fn resolve(
        &mut self,
        name: &str,
        env: &BackendEnv,
        stack: &mut Vec<String>,
    ) -> Result<(), BuildError> {
        if self.get(name).is_some() {
            return Ok(());
        }
        if stack.iter().any(|n| n == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(ConfigError::BackendCycle { chain }.into());
        }

        let backend = instantiate(name, env)?;
        stack.push(name.to_string());
        for dep in backend.backend_dependencies() {
            self.resolve(&dep, env, stack)?;
        }
        stack.pop();

        self.register(backend)?;
        Ok(())
    }

    /// Append a backend.
    ///
    /// A backend whose name is already registered is skipped.
    pub fn register(&mut self, backend: Box<dyn Backend>) -> Result<(), ConfigError> {
        if self.get(backend.name()).is_some() {
            debug!("backend `{}` already registered", backend.name());
            return Ok(());
        }
        if backend.wants_main_file_rewrite() {
            if let Some(existing) = self.main_file_claimant() {
                return Err(ConfigError::ConflictingMainFileRewrite {
                    backends: vec![existing.name().to_string(), backend.name().to_string()],
                });
            }
        }
        debug!("registered backend `{}`", backend.name());
        self.backends.push(backend);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Backend> + '_ {
        self.backends.iter().map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    /// The backend generating the program entry point, if any.
    pub fn main_file_claimant(&self) -> Option<&dyn Backend> {
        self.iter().find(|b| b.wants_main_file_rewrite())
    }

    /// Union of names excluded by any backend, first occurrence kept.
    pub fn excluded_dependencies(&self) -> Result<Vec<String>, BuildError> {
        let mut out: Vec<String> = Vec::new();
        for backend in &self.backends {
            let names = backend
                .excluded_dependencies()
                .map_err(|e| BuildError::backend(backend.name(), None, e))?;
            for name in names {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
        Ok(out)
    }
}

fn instantiate(name: &str, env: &BackendEnv) -> Result<Box<dyn Backend>, BuildError> {
    if let Ok(id) = name.parse::<BackendId>() {
        return Ok(id.instantiate(env));
    }
    match find_descriptor(env, name) {
        Some(path) => {
            debug!("loading backend `{}` from {}", name, path.display());
            let backend = DescriptorBackend::load(&path, env)?;
            if backend.name() != name {
                return Err(BuildError::Decoding {
                    what: path.display().to_string(),
                    message: format!("descriptor declares name `{}`", backend.name()),
                });
            }
            Ok(Box::new(backend))
        }
        None => {
            let builtins: Vec<_> = BackendId::all().iter().map(|id| id.as_str()).collect();
            Err(ConfigError::UnknownBackend {
                name: name.to_string(),
                known: Some(format!(
                    "built-in backends: {}; descriptors are read from {}",
                    builtins.join(", "),
                    env.backends_dir.display()
                )),
            }
            .into())
        }
    }
}
