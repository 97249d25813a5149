//! Model capability abstractions for advisor-runtime.
//!
//! The orchestrator only ever sees a [`TextGenerator`]: something that is
//! either available or not, and turns a prompt into text. Backends live
//! behind cargo features; [`fake`] provides scripted generators for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod fake;

#[cfg(feature = "local")]
mod local;

pub use factory::{ProviderFactory, ProviderRegistry};

#[cfg(feature = "local")]
pub use local::{LocalGenerator, LocalGeneratorFactory};

/// Errors from model backends.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Cannot reach model server at {0}")]
    Connection(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Fixed generation parameters for a diagnosis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Sample instead of greedy decoding
    pub sampling: bool,

    /// Prompt length budget; longer prompts are truncated by the backend
    pub max_prompt_tokens: u32,

    /// Upper bound on a single generation
    #[serde(with = "crate::config::humantime_duration")]
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            sampling: true,
            max_prompt_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }
}

impl GenerationConfig {
    /// Temperature actually sent to the backend; zero when sampling is off.
    pub fn effective_temperature(&self) -> f32 {
        if self.sampling {
            self.temperature
        } else {
            0.0
        }
    }
}

/// Text produced by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Generated text; may or may not start with the echoed prompt
    pub text: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model used
    pub model: String,

    /// Stop reason
    pub stop_reason: Option<String>,
}

/// Token usage from a generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens generated
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// The model capability injected into the orchestrator.
///
/// Implementations are constructed once at startup and shared behind an
/// `Arc`. They must not hold per-request state.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Generation, ProviderError>;

    /// Whether the capability can serve requests at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Probe the backend (e.g. the model is present on the server).
    async fn health_check(&self) -> bool;

    /// Provider name for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // Simple estimate: ~4 chars per token
        (text.len() / 4) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.temperature, 0.7);
        assert!(config.sampling);
        assert_eq!(config.max_prompt_tokens, 2048);
    }

    #[test]
    fn test_effective_temperature() {
        let config = GenerationConfig {
            sampling: false,
            ..Default::default()
        };
        assert_eq!(config.effective_temperature(), 0.0);
        assert_eq!(GenerationConfig::default().effective_temperature(), 0.7);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_generation_config_from_yaml() {
        let config: GenerationConfig =
            serde_yaml::from_str("temperature: 0.2\ntimeout: 90s\n").unwrap();
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.max_tokens, 512);
    }

    #[test]
    fn test_model_is_not_a_generation_setting() {
        // The model name belongs to the provider options.
        let result = serde_yaml::from_str::<GenerationConfig>("model: meditron
");
        assert!(result.is_err());
    }
}
