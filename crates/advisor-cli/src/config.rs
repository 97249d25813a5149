//! Configuration file for the `advisor` binary.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8000
//!   allowed_origins: ["http://localhost:3000"]
//! model:
//!   provider: local
//!   options:
//!     endpoint: http://localhost:11434
//! generation:
//!   timeout: 60s
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use advisor_runtime::{ProviderRegistry, RuntimeConfig};

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Full configuration: server settings plus the runtime's model settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub server: ServerConfig,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

impl AdvisorConfig {
    /// Load from a YAML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .runtime
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    /// Check the configured provider's options against the registry.
    ///
    /// An unreachable model still degrades to heuristics at runtime; a
    /// misspelled provider or malformed options fail startup instead.
    pub fn validate_provider(&self, registry: &ProviderRegistry) -> Result<()> {
        let Some(provider) = self.runtime.model.provider.as_deref() else {
            return Ok(());
        };

        registry
            .validate(provider, &self.runtime.model.options)
            .with_context(|| format!("Invalid settings for model provider '{provider}'"))
    }
}
