//! Per-file tracking of defined components.
//!
//! A name enters the registry only once its component has compiled and
//! validated. Aliases bind a new name to an existing artifact. A fresh
//! registry is created for every script file.

use super::name::ComponentName;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("component instance references unknown component {0}")]
    UnknownComponent(ComponentName),
    #[error("invoke references unknown instance {0}")]
    UnknownInstance(ComponentName),
}

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    artifacts: HashMap<ComponentName, PathBuf>,
    anonymous: u32,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a compiled and validated component. Redefining a name replaces
    /// the earlier artifact.
    pub fn define(&mut self, name: ComponentName, artifact: impl Into<PathBuf>) {
        self.artifacts.insert(name, artifact.into());
    }

    /// Bind `name` to the artifact of `existing`.
    pub fn alias(&mut self, name: ComponentName, existing: &ComponentName) -> Result<&Path, RegistryError> {
        let artifact = self
            .artifacts
            .get(existing)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownComponent(existing.clone()))?;
        let slot = self.artifacts.entry(name).or_default();
        *slot = artifact;
        Ok(slot.as_path())
    }

    pub fn resolve(&self, name: &ComponentName) -> Option<&Path> {
        self.artifacts.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &ComponentName) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Synthesize the name for the next anonymous definition: `$anon_def_1`,
    /// `$anon_def_2`, ...
    pub fn next_anonymous_name(&mut self) -> ComponentName {
        self.anonymous += 1;
        ComponentName::from_counter(self.anonymous)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> ComponentName {
        ComponentName::new(text).unwrap()
    }

    #[test]
    fn define_and_resolve() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.is_empty());
        registry.define(name("$c"), "/tmp/c.wasm");
        assert!(registry.contains(&name("$c")));
        assert_eq!(registry.resolve(&name("$c")), Some(Path::new("/tmp/c.wasm")));
        assert_eq!(registry.resolve(&name("$d")), None);
    }

    #[test]
    fn alias_shares_artifact() {
        let mut registry = ComponentRegistry::new();
        registry.define(name("$c"), "/tmp/c.wasm");
        let path = registry.alias(name("$i"), &name("$c")).unwrap().to_path_buf();
        assert_eq!(path, Path::new("/tmp/c.wasm"));
        assert_eq!(registry.resolve(&name("$i")), Some(Path::new("/tmp/c.wasm")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn alias_of_unknown_component_fails_without_inserting() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(
            registry.alias(name("$i"), &name("$missing")),
            Err(RegistryError::UnknownComponent(name("$missing")))
        );
        assert!(!registry.contains(&name("$i")));
        assert_eq!(
            RegistryError::UnknownComponent(name("$missing")).to_string(),
            "component instance references unknown component $missing"
        );
    }

    #[test]
    fn anonymous_names_count_up_independently_of_named_definitions() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(registry.next_anonymous_name().as_str(), "$anon_def_1");
        registry.define(name("$named"), "/tmp/n.wasm");
        assert_eq!(registry.next_anonymous_name().as_str(), "$anon_def_2");
        assert_eq!(ComponentRegistry::new().next_anonymous_name().as_str(), "$anon_def_1");
    }
}
