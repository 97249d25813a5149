//! # advisor-core
//!
//! Deterministic building blocks of the symptom advisor.
//!
//! This crate never calls a language model. It provides:
//! - [`PromptBuilder`]: renders patient input into the model prompt
//! - [`ResponseExtractor`]: recovers a [`DiagnosisResult`] from model text
//! - [`HeuristicDiagnosisEngine`]: rule-based diagnosis without a model
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **Total**: Extraction and heuristic diagnosis never fail
//! 3. **Bounded**: Confidence is clamped to 0-100 and severity is a closed set
//!
//! ## Example
//!
//! ```rust
//! use advisor_core::{HeuristicDiagnosisEngine, Severity};
//!
//! let engine = HeuristicDiagnosisEngine::new();
//! let result = engine.diagnose(&["fever".to_string()], 30, "male");
//!
//! assert_eq!(result.disease, "Common Cold");
//! assert_eq!(result.severity, Severity::Low);
//! ```

pub mod extractor;
pub mod heuristic;
pub mod prompt;
pub mod types;

// Re-export main types at crate root
pub use extractor::{general_assessment, ExtractionError, ResponseExtractor};
pub use heuristic::{DiagnosisRule, HeuristicDiagnosisEngine, KeywordRule};
pub use prompt::PromptBuilder;
pub use types::{Confidence, DiagnosisResult, Medicine, Severity, SymptomRequest};
