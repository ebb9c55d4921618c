use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::{HarnessError, Result};
use super::strategy::BuildStrategy;

#[derive(Clone, Default)]
pub struct BuildRegistry {
    strategies: BTreeMap<String, Arc<dyn BuildStrategy>>,
}

impl BuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn BuildStrategy>) {
        self.strategies.insert(name.into(), strategy);
    }

    pub fn with(mut self, name: impl Into<String>, strategy: Arc<dyn BuildStrategy>) -> Self {
        self.register(name, strategy);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn BuildStrategy>> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| HarnessError::Configuration(format!("No installer for {}.", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for BuildRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.strategies.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::CommandBuildStrategy;

    #[test]
    fn test_get_unknown_name() {
        let registry = BuildRegistry::new();
        let err = registry.get("ion-hash-rust").err().unwrap();
        assert_eq!(err.to_string(), "Configuration error: No installer for ion-hash-rust.");
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = BuildRegistry::new()
            .with("zeta", Arc::new(CommandBuildStrategy::default()))
            .with("alpha", Arc::new(CommandBuildStrategy::default()));

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(registry.contains("alpha"));
        assert_eq!(registry.len(), 2);
    }
}
