//! Dependency and package aggregation across backends.

use std::collections::BTreeMap;

use tracing::debug;

use crate::backend::registry::BackendRegistry;
use crate::core::dependency::Dependency;
use crate::core::errors::{BuildError, ConfigError};
use crate::core::package_source::PackageSource;
use crate::core::platform::XcodeTarget;
use crate::util::pyproject::normalize_name;

/// Set union of native dependencies keyed by (kind, reference, products).
///
/// The first contribution of a key keeps its position. A later
/// contribution of the same key with a different platform filter widens
/// the dependency to every platform.
#[derive(Debug, Default, Clone)]
pub struct DependencyAggregator {
    deps: Vec<Dependency>,
}

impl DependencyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dep: Dependency) {
        match self.deps.iter_mut().find(|d| d.key() == dep.key()) {
            Some(existing) => {
                if existing.platform_filter != dep.platform_filter {
                    debug!("{} linked on several platforms, dropping its filter", existing);
                    existing.platform_filter = None;
                }
            }
            None => self.deps.push(dep),
        }
    }

    pub fn extend(&mut self, deps: impl IntoIterator<Item = Dependency>) {
        for dep in deps {
            self.add(dep);
        }
    }

    /// Add every backend's contribution for each of `platforms`.
    pub fn collect(
        &mut self,
        registry: &BackendRegistry,
        platforms: &[XcodeTarget],
    ) -> Result<(), BuildError> {
        for backend in registry.iter() {
            for platform in platforms {
                let deps = backend
                    .target_dependencies(*platform)
                    .map_err(|e| BuildError::backend(backend.name(), Some(platform.to_string()), e))?;
                self.extend(deps);
            }
        }
        Ok(())
    }

    /// Drop every dependency whose reference is one of `names`.
    ///
    /// Names compare after normalization, so `Kivy_Launcher` removes
    /// `KivyLauncher`.
    pub fn exclude(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let names: Vec<String> = names.iter().map(|n| normalize_name(n)).collect();
        self.deps.retain(|d| {
            let keep = !names.contains(&normalize_name(&d.reference));
            if !keep {
                debug!("excluding {}", d);
            }
            keep
        });
    }

    pub fn contains_reference(&self, reference: &str) -> bool {
        self.deps.iter().any(|d| d.reference == reference)
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn into_vec(self) -> Vec<Dependency> {
        self.deps
    }
}

/// Native packages by name, remembering who defined each one.
#[derive(Debug, Default, Clone)]
pub struct PackageSet {
    packages: BTreeMap<String, (String, PackageSource)>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package defined by `owner`.
    ///
    /// Redefining a package with an identical source is accepted; a
    /// different source is a configuration error.
    pub fn insert(
        &mut self,
        owner: &str,
        name: &str,
        source: PackageSource,
    ) -> Result<(), ConfigError> {
        if let Some((first, existing)) = self.packages.get(name) {
            if *existing != source {
                return Err(ConfigError::ConflictingPackage {
                    package: name.to_string(),
                    first: first.clone(),
                    second: owner.to_string(),
                });
            }
            return Ok(());
        }
        self.packages
            .insert(name.to_string(), (owner.to_string(), source));
        Ok(())
    }

    /// Add every backend's packages in registration order.
    pub fn collect(&mut self, registry: &BackendRegistry) -> Result<(), BuildError> {
        for backend in registry.iter() {
            let packages = backend
                .packages()
                .map_err(|e| BuildError::backend(backend.name(), None, e))?;
            for (name, source) in packages {
                self.insert(backend.name(), &name, source)?;
            }
        }
        Ok(())
    }

    pub fn into_map(self) -> BTreeMap<String, PackageSource> {
        self.packages
            .into_iter()
            .map(|(name, (_, source))| (name, source))
            .collect()
    }
}
