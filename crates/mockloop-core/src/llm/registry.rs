//! Provider registry for runtime provider lookup.
//!
//! Maps a provider name to a constructor. Instances are built on first use
//! and shared afterwards; `validate` builds the ones that must work up front
//! so misconfiguration surfaces at startup instead of mid-interview.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use mockloop_types::llm::LlmError;

use super::box_provider::BoxLlmProvider;

/// Constructor for a named provider.
pub type ProviderFactory = Box<dyn Fn() -> Result<BoxLlmProvider, LlmError> + Send + Sync>;

/// Registry of available generation backends, indexed by name.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
    instances: DashMap<String, Arc<BoxLlmProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: DashMap::new(),
        }
    }

    /// Register a constructor under the given name.
    ///
    /// If a provider with this name already exists, it is replaced.
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) {
        let name = name.into();
        self.instances.remove(&name);
        self.factories.insert(name, factory);
    }

    /// Register an already-built provider under its own name.
    pub fn register_instance(&mut self, provider: BoxLlmProvider) {
        let name = provider.name().to_string();
        self.instances.insert(name.clone(), Arc::new(provider));
        self.factories.insert(
            name.clone(),
            Box::new(move || {
                Err(LlmError::Provider {
                    message: format!("provider '{name}' was registered as an instance"),
                })
            }),
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Look up a provider by name, constructing it on first use.
    pub fn get(&self, name: &str) -> Result<Arc<BoxLlmProvider>, LlmError> {
        if let Some(provider) = self.instances.get(name) {
            return Ok(provider.clone());
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LlmError::UnknownProvider(name.to_string()))?;
        let provider = Arc::new(factory()?);
        debug!(provider = %name, model = %provider.model(), "constructed provider");
        Ok(self
            .instances
            .entry(name.to_string())
            .or_insert(provider)
            .clone())
    }

    /// Build every registered provider once.
    ///
    /// Providers named in `required` must construct successfully; failures of
    /// the others are logged and retried on first use.
    pub fn validate(&self, required: &[&str]) -> Result<(), LlmError> {
        for name in required {
            self.get(name)?;
        }
        for name in self.factories.keys() {
            if required.contains(&name.as_str()) {
                continue;
            }
            if let Err(e) = self.get(name) {
                warn!(provider = %name, error = %e, "provider unavailable");
            }
        }
        Ok(())
    }

    /// List all registered provider names, sorted.
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedProvider;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unknown_provider_is_typed_error() {
        let registry = ProviderRegistry::new();
        let err = registry.get("gemini").err().unwrap();
        assert!(matches!(err, LlmError::UnknownProvider(ref n) if n == "gemini"));
    }

    #[test]
    fn test_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ProviderRegistry::new();
        registry.register(
            "dry",
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(BoxLlmProvider::new(ScriptedProvider::new("dry")))
            }),
        );

        registry.validate(&["dry"]).unwrap();
        let a = registry.get("dry").unwrap();
        let b = registry.get("dry").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validate_fails_only_for_required() {
        let mut registry = ProviderRegistry::new();
        registry.register("broken", Box::new(|| Err(LlmError::AuthenticationFailed)));
        registry.register(
            "dry",
            Box::new(|| Ok(BoxLlmProvider::new(ScriptedProvider::new("dry")))),
        );

        assert!(registry.validate(&["dry"]).is_ok());
        assert!(matches!(
            registry.validate(&["broken"]),
            Err(LlmError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_register_instance() {
        let mut registry = ProviderRegistry::new();
        registry.register_instance(BoxLlmProvider::new(ScriptedProvider::new("x")));
        assert!(registry.contains("x"));
        assert_eq!(registry.get("x").unwrap().name(), "x");
        assert_eq!(registry.list_names(), vec!["x"]);
    }
}
