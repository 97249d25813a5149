//! Provider factory pattern for selecting a model backend from configuration.
//!
//! Backends register factories that create generators from a JSON options
//! block, so the binary can pick one by name.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = ProviderRegistry::new();
//! registry.register(Arc::new(LocalGeneratorFactory));
//!
//! let generator = registry.create("local", &options)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{ProviderError, TextGenerator};

/// Factory for creating generators from configuration.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "local".
    fn provider_type(&self) -> &'static str;

    /// Create a generator from provider-specific JSON options.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn TextGenerator>, ProviderError>;

    /// Validate configuration without creating a generator.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;
}

/// Registry of available provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Create a generator from type name and options.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn TextGenerator>, ProviderError> {
        let factory = self.factory(provider_type)?;
        factory.validate_config(config)?;
        factory.create(config)
    }

    /// Validate options for a provider type without creating it.
    pub fn validate(&self, provider_type: &str, config: &JsonValue) -> Result<(), ProviderError> {
        self.factory(provider_type)?.validate_config(config)
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })
    }

    /// Create a registry with all built-in providers registered.
    #[cfg(feature = "local")]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::LocalGeneratorFactory));
        registry
    }

    /// Create a registry with all built-in providers registered.
    #[cfg(not(feature = "local"))]
    pub fn with_defaults() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fake::FakeGenerator;

    struct FakeFactory;

    impl ProviderFactory for FakeFactory {
        fn provider_type(&self) -> &'static str {
            "fake"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn TextGenerator>, ProviderError> {
            let reply = config["reply"].as_str().unwrap_or("{}").to_string();
            Ok(Arc::new(FakeGenerator::replying(reply)))
        }

        fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
            if config.get("reply").is_some_and(|r| !r.is_string()) {
                return Err(ProviderError::NotConfigured(
                    "reply must be a string".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn test_registry_register_and_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeFactory));

        let generator = registry.create("fake", &serde_json::json!({"reply": "hi"}));
        assert!(generator.is_ok());
        assert_eq!(generator.unwrap().name(), "fake");
    }

    #[test]
    fn test_registry_unknown_provider() {
        let registry = ProviderRegistry::new();

        match registry.create("unknown", &serde_json::json!({})) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("Unknown provider type"));
            }
            _ => panic!("Expected NotConfigured error"),
        }
    }

    #[test]
    fn test_create_validates_first() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeFactory));

        let result = registry.create("fake", &serde_json::json!({"reply": 42}));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_registry_available_types() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.available_types().is_empty());

        registry.register(Arc::new(FakeFactory));
        assert_eq!(registry.available_types(), vec!["fake"]);
    }

    #[test]
    fn test_validate_without_creating() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeFactory));

        assert!(registry.validate("fake", &serde_json::json!({"reply": "ok"})).is_ok());
        assert!(registry.validate("fake", &serde_json::json!({"reply": 1})).is_err());
        assert!(matches!(
            registry.validate("unknown", &serde_json::json!({})),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
