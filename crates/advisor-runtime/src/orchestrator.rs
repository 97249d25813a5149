//! Diagnosis orchestrator.
//!
//! Per request:
//! 1. ModelCheck: no generator, or generator unavailable → heuristic
//! 2. Invoke: build prompt, generate under a timeout, strip echoed prompt
//! 3. Extract: recover a diagnosis; unusable output → general assessment
//! 4. Fallback: any invocation failure → heuristic
//!
//! Every path returns a complete [`DiagnosisResult`]. Failures are typed as
//! [`PipelineError`] and logged, never returned to the caller. There are
//! no retries.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use advisor_core::{
    general_assessment, DiagnosisResult, ExtractionError, HeuristicDiagnosisEngine,
    PromptBuilder, ResponseExtractor, SymptomRequest,
};

use crate::config::RuntimeConfig;
use crate::providers::{
    GenerationConfig, ProviderError, ProviderRegistry, TextGenerator, TokenUsage,
};

/// Why a request did not get a model-produced diagnosis.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Model unavailable")]
    ModelUnavailable,

    #[error("Generation failed: {0}")]
    GenerationFailure(#[from] ProviderError),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model backend panicked: {0}")]
    Panicked(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(#[from] ExtractionError),
}

/// Which path produced a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSource {
    /// Parsed from model output
    Model,

    /// Model answered but the output was unusable
    ModelDefault,

    /// Rule-based engine, no model answer
    Heuristic,
}

/// A diagnosis together with how it was produced.
#[derive(Debug)]
pub struct DiagnosisReport {
    pub result: DiagnosisResult,
    pub source: DiagnosisSource,

    /// The failure that degraded this request, if any
    pub degraded_by: Option<PipelineError>,

    /// Token usage when the model was invoked successfully
    pub usage: Option<TokenUsage>,

    pub diagnosed_at: DateTime<Utc>,
}

/// Output of a successful model invocation.
struct Invocation {
    continuation: String,
    usage: TokenUsage,
}

/// Coordinates prompt building, model invocation, extraction and fallback.
pub struct DiagnosisOrchestrator {
    generator: Option<Arc<dyn TextGenerator>>,
    generation: GenerationConfig,
    prompts: PromptBuilder,
    extractor: ResponseExtractor,
    heuristic: HeuristicDiagnosisEngine,
}

impl DiagnosisOrchestrator {
    /// Create an orchestrator. `None` means no model is loaded.
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: RuntimeConfig) -> Self {
        Self {
            generator,
            generation: config.generation,
            prompts: PromptBuilder::new(),
            extractor: ResponseExtractor::new(),
            heuristic: HeuristicDiagnosisEngine::new(),
        }
    }

    /// Resolve the configured provider and probe it once.
    ///
    /// A missing provider, a creation error or a failed health check all
    /// yield a heuristic-only orchestrator; this never fails.
    pub async fn from_config(config: RuntimeConfig, registry: &ProviderRegistry) -> Self {
        let generator = match config.model.provider.as_deref() {
            None => {
                tracing::info!("No model provider configured, heuristic diagnosis only");
                None
            }
            Some(provider) => match registry.create(provider, &config.model.options) {
                Ok(generator) if generator.health_check().await => {
                    tracing::info!(provider, "Model provider ready");
                    Some(generator)
                }
                Ok(_) => {
                    tracing::warn!(provider, "Model provider failed health check, heuristic diagnosis only");
                    None
                }
                Err(e) => {
                    tracing::warn!(provider, error = %e, "Failed to create model provider, heuristic diagnosis only");
                    None
                }
            },
        };

        Self::new(generator, config)
    }

    /// Orchestrator that always uses the heuristic engine.
    pub fn heuristic_only() -> Self {
        Self::new(None, RuntimeConfig::default())
    }

    pub fn builder() -> DiagnosisOrchestratorBuilder {
        DiagnosisOrchestratorBuilder::new()
    }

    /// Whether a usable model is attached.
    pub fn model_loaded(&self) -> bool {
        self.generator
            .as_ref()
            .is_some_and(|generator| generator.is_available())
    }

    /// Name of the attached provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.generator.as_ref().map(|generator| generator.name())
    }

    /// Diagnose a request. Never fails.
    pub async fn diagnose(&self, request: &SymptomRequest) -> DiagnosisResult {
        self.diagnose_with_report(request).await.result
    }

    /// Diagnose a request and report which path produced the result.
    pub async fn diagnose_with_report(&self, request: &SymptomRequest) -> DiagnosisReport {
        let diagnosed_at = Utc::now();

        let (result, source, degraded_by, usage) = match self.invoke(request).await {
            Ok(invocation) => match self.extractor.try_extract(&invocation.continuation) {
                Ok(result) => (result, DiagnosisSource::Model, None, Some(invocation.usage)),
                Err(e) => {
                    tracing::warn!(error = %e, "Model output unusable, returning general assessment");
                    (
                        general_assessment(),
                        DiagnosisSource::ModelDefault,
                        Some(PipelineError::from(e)),
                        Some(invocation.usage),
                    )
                }
            },
            Err(PipelineError::ModelUnavailable) => {
                tracing::debug!("Model not available, using heuristic diagnosis");
                (
                    self.heuristic.diagnose_request(request),
                    DiagnosisSource::Heuristic,
                    Some(PipelineError::ModelUnavailable),
                    None,
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model invocation failed, falling back to heuristic");
                (
                    self.heuristic.diagnose_request(request),
                    DiagnosisSource::Heuristic,
                    Some(e),
                    None,
                )
            }
        };

        tracing::info!(
            source = ?source,
            disease = %result.disease,
            severity = %result.severity,
            "Diagnosis complete"
        );

        DiagnosisReport {
            result,
            source,
            degraded_by,
            usage,
            diagnosed_at,
        }
    }

    /// ModelCheck and Invoke stages.
    async fn invoke(&self, request: &SymptomRequest) -> Result<Invocation, PipelineError> {
        let generator = match &self.generator {
            Some(generator) if generator.is_available() => generator,
            _ => return Err(PipelineError::ModelUnavailable),
        };

        let prompt = self.prompts.build_for(request);

        let estimated = generator.estimate_tokens(&prompt);
        if estimated > self.generation.max_prompt_tokens {
            tracing::warn!(
                estimated_tokens = estimated,
                budget = self.generation.max_prompt_tokens,
                "Prompt exceeds token budget and may be truncated"
            );
        }

        let timeout = self.generation.timeout;
        let call = AssertUnwindSafe(generator.generate(&prompt, &self.generation)).catch_unwind();

        let generation = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(panic)) => return Err(PipelineError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => return Err(PipelineError::Timeout(timeout)),
        };

        tracing::debug!(
            provider = generator.name(),
            model = %generation.model,
            tokens = generation.usage.total(),
            stop_reason = ?generation.stop_reason,
            "Model generation finished"
        );

        Ok(Invocation {
            continuation: strip_prompt_echo(&prompt, &generation.text).to_string(),
            usage: generation.usage,
        })
    }
}

/// Remove the prompt from the front of a causal-LM decode, if present.
pub fn strip_prompt_echo<'a>(prompt: &str, text: &'a str) -> &'a str {
    text.strip_prefix(prompt).unwrap_or(text).trim()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for DiagnosisOrchestrator.
pub struct DiagnosisOrchestratorBuilder {
    generator: Option<Arc<dyn TextGenerator>>,
    config: RuntimeConfig,
    heuristic: Option<HeuristicDiagnosisEngine>,
}

impl DiagnosisOrchestratorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            generator: None,
            config: RuntimeConfig::default(),
            heuristic: None,
        }
    }

    /// Attach the model capability.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the heuristic engine.
    pub fn heuristic(mut self, engine: HeuristicDiagnosisEngine) -> Self {
        self.heuristic = Some(engine);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> DiagnosisOrchestrator {
        let mut orchestrator = DiagnosisOrchestrator::new(self.generator, self.config);
        if let Some(engine) = self.heuristic {
            orchestrator.heuristic = engine;
        }
        orchestrator
    }
}

impl Default for DiagnosisOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
