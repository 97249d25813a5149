//! Runtime configuration.
//!
//! Loaded from YAML. Durations are written in human-readable form
//! (`60s`, `2m 30s`).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::providers::GenerationConfig;

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which model backend to use, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider type registered in the `ProviderRegistry`; `None` disables
    /// the model and every request uses the heuristic engine
    pub provider: Option<String>,

    /// Provider-specific options, passed to the provider factory
    pub options: JsonValue,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: Some("local".to_string()),
            options: serde_json::json!({}),
        }
    }
}

/// Configuration for the diagnosis runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub model: ModelSettings,
    pub generation: GenerationConfig,
}

impl RuntimeConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;

        if generation.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_tokens must be positive".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be within 0.0-2.0, got {}",
                generation.temperature
            )));
        }
        if generation.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "generation.timeout must be positive".to_string(),
            ));
        }
        if !self.model.options.is_object() && !self.model.options.is_null() {
            return Err(ConfigError::Invalid(
                "model.options must be a mapping".to_string(),
            ));
        }

        Ok(())
    }
}

pub(crate) mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
