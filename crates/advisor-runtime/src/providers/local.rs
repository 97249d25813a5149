//! Local model server backend.
//!
//! Talks to an Ollama-compatible inference server: `POST /api/generate` for
//! completions and `GET /api/tags` to confirm the model is loaded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use super::{
    factory::ProviderFactory, Generation, GenerationConfig, ProviderError, TextGenerator,
    TokenUsage,
};

/// Default address of a local inference server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Model requested when the options name none.
pub const DEFAULT_MODEL: &str = "mmed-llama-3-8b-enins";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Generator backed by a local inference server.
#[derive(Debug)]
pub struct LocalGenerator {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl LocalGenerator {
    /// Create a generator for `model` served at `endpoint`.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    /// Create from JSON options.
    ///
    /// Recognized keys: `endpoint` (default `http://localhost:11434`) and
    /// `model` (default `mmed-llama-3-8b-enins`).
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let endpoint = config["endpoint"].as_str().unwrap_or(DEFAULT_ENDPOINT);
        let model = config["model"].as_str().unwrap_or(DEFAULT_MODEL);

        Self::new(endpoint, model)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(&self, e: reqwest::Error, timeout: Duration) -> ProviderError {
        if e.is_connect() {
            ProviderError::Connection(self.endpoint.clone())
        } else if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::HttpError(e.to_string())
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.endpoint))
            .timeout(CONNECT_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, CONNECT_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    num_ctx: u32,
}

impl GenerateOptions {
    /// Context window covers the prompt budget plus the completion.
    fn from_config(config: &GenerationConfig) -> Self {
        Self {
            num_predict: config.max_tokens,
            temperature: config.effective_temperature(),
            num_ctx: config.max_prompt_tokens.saturating_add(config.max_tokens),
        }
    }
}

/// Response body from `/api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[async_trait]
impl TextGenerator for LocalGenerator {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Generation, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions::from_config(config),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, config.timeout))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::ModelNotFound(self.model.clone()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(Generation {
            text: body.response,
            usage: TokenUsage {
                prompt_tokens: body.prompt_eval_count,
                completion_tokens: body.eval_count,
            },
            model: body.model.unwrap_or_else(|| self.model.clone()),
            stop_reason: body.done_reason,
        })
    }

    async fn health_check(&self) -> bool {
        match self.list_models().await {
            Ok(models) => {
                let found = models.iter().any(|m| m.starts_with(&self.model));
                if !found {
                    tracing::warn!(model = %self.model, available = ?models, "Model not present on server");
                }
                found
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Model server unreachable");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Factory for [`LocalGenerator`].
///
/// ## Configuration Format
/// ```json
/// {
///   "endpoint": "http://localhost:11434",  // Optional
///   "model": "mmed-llama-3-8b-enins"       // Optional
/// }
/// ```
pub struct LocalGeneratorFactory;

impl ProviderFactory for LocalGeneratorFactory {
    fn provider_type(&self) -> &'static str {
        "local"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn TextGenerator>, ProviderError> {
        Ok(Arc::new(LocalGenerator::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if let Some(url) = config.get("endpoint") {
            let url = url.as_str().ok_or_else(|| {
                ProviderError::NotConfigured("endpoint must be a string".to_string())
            })?;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "endpoint must start with http:// or https://".to_string(),
                ));
            }
        }

        if config.get("model").is_some_and(|m| !m.is_string()) {
            return Err(ProviderError::NotConfigured(
                "model must be a string".to_string(),
            ));
        }

        Ok(())
    }
}
