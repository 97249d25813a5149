//! # advisor-runtime
//!
//! Model-assisted diagnosis for the symptom advisor.
//!
//! The [`DiagnosisOrchestrator`] asks a [`TextGenerator`] for a diagnosis,
//! extracts a structured result from its free-form output, and falls back
//! to the rule-based engine in `advisor-core` whenever the model is
//! missing, slow, failing or panicking. Every request gets a complete
//! [`DiagnosisResult`](advisor_core::DiagnosisResult).
//!
//! ## Example
//!
//! ```rust,ignore
//! use advisor_runtime::{DiagnosisOrchestrator, ProviderRegistry, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("advisor.yaml")?;
//! let orchestrator =
//!     DiagnosisOrchestrator::from_config(config, &ProviderRegistry::with_defaults()).await;
//!
//! let result = orchestrator.diagnose(&request).await;
//! ```
//!
//! ## Features
//!
//! - `local`: HTTP backend for an Ollama-compatible inference server

pub mod config;
pub mod orchestrator;
pub mod providers;

pub use config::{ConfigError, ModelSettings, RuntimeConfig};
pub use orchestrator::{
    strip_prompt_echo, DiagnosisOrchestrator, DiagnosisOrchestratorBuilder, DiagnosisReport,
    DiagnosisSource, PipelineError,
};
pub use providers::{
    Generation, GenerationConfig, ProviderError, ProviderFactory, ProviderRegistry,
    TextGenerator, TokenUsage,
};

#[cfg(feature = "local")]
pub use providers::{LocalGenerator, LocalGeneratorFactory};
