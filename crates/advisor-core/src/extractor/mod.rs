//! Recovering a structured diagnosis from raw model output.
//!
//! Model output is free text that may contain a JSON object, several, a
//! truncated one or none at all. [`ResponseExtractor::extract`] never fails:
//! when nothing usable is found it returns [`general_assessment`].

mod scan;
mod schema;

pub use scan::{object_candidates, strip_think_blocks};
pub use schema::validate_diagnosis_schema;

use serde::Deserialize;
use thiserror::Error;

use crate::prompt::is_template_example;
use crate::types::{Confidence, DiagnosisResult, Medicine, Severity};

/// Why model output could not be turned into a diagnosis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("No JSON object found in model output")]
    NoJsonObject,

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("Shape mismatch: {}", .0.join("; "))]
    ShapeMismatch(Vec<String>),

    #[error("Output repeats the prompt's example instead of answering")]
    TemplateEcho,
}

/// The diagnosis object as the model writes it, before normalization.
#[derive(Debug, Deserialize)]
struct RawDiagnosis {
    disease: String,
    confidence: serde_json::Value,
    description: String,
    severity: String,
    medicines: Vec<Medicine>,
    recommendations: Vec<String>,
}

impl RawDiagnosis {
    fn normalize(self) -> Result<DiagnosisResult, ExtractionError> {
        let confidence = parse_confidence(&self.confidence).ok_or_else(|| {
            ExtractionError::ShapeMismatch(vec![format!(
                "confidence is not numeric: {}",
                self.confidence
            )])
        })?;

        let result = DiagnosisResult {
            disease: self.disease.trim().to_string(),
            confidence: Confidence::new(confidence),
            description: self.description,
            severity: Severity::parse_or_medium(&self.severity),
            medicines: self.medicines,
            recommendations: self.recommendations,
        };

        if !result.is_complete() {
            return Err(ExtractionError::ShapeMismatch(vec![
                "disease, medicines and recommendations must be non-empty".to_string(),
            ]));
        }

        Ok(result)
    }
}

/// Accepts `85`, `85.5`, `"85"` and `"85%"`.
fn parse_confidence(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Extracts diagnoses from model output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract a diagnosis, falling back to [`general_assessment`].
    pub fn extract(&self, raw: &str) -> DiagnosisResult {
        self.try_extract(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Model output unusable, using general assessment");
            general_assessment()
        })
    }

    /// Extract a diagnosis, reporting why it failed.
    ///
    /// Candidate objects are tried left to right and the first one that
    /// parses and validates wins. When every candidate fails, the error
    /// of the last candidate is returned.
    pub fn try_extract(&self, raw: &str) -> Result<DiagnosisResult, ExtractionError> {
        let cleaned = strip_think_blocks(raw);
        let mut last_error = ExtractionError::NoJsonObject;

        for candidate in object_candidates(&cleaned) {
            match parse_candidate(candidate) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::trace!(error = %e, "Rejected JSON candidate");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

fn parse_candidate(candidate: &str) -> Result<DiagnosisResult, ExtractionError> {
    let value: serde_json::Value =
        serde_json::from_str(candidate).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    validate_diagnosis_schema(&value).map_err(ExtractionError::ShapeMismatch)?;

    if is_template_example(&value) {
        return Err(ExtractionError::TemplateEcho);
    }

    let raw: RawDiagnosis = serde_json::from_value(value)
        .map_err(|e| ExtractionError::ShapeMismatch(vec![e.to_string()]))?;

    raw.normalize()
}

/// Generic answer used when model output cannot be recovered.
pub fn general_assessment() -> DiagnosisResult {
    DiagnosisResult {
        disease: "General Symptom Assessment".to_string(),
        confidence: Confidence::new(75.0),
        description: "Based on the symptoms provided, further medical evaluation is recommended."
            .to_string(),
        severity: Severity::Medium,
        medicines: vec![Medicine::new(
            "Paracetamol",
            "500mg",
            "Every 6-8 hours as needed",
            "3-5 days",
            "Take with food, do not exceed 4g per day",
        )],
        recommendations: vec![
            "Rest and get adequate sleep".to_string(),
            "Stay hydrated with plenty of fluids".to_string(),
            "Monitor symptoms and seek medical attention if they worsen".to_string(),
            "Consult a healthcare professional for proper evaluation".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "disease": "X",
        "confidence": 90,
        "description": "Something specific",
        "severity": "High",
        "medicines": [{
            "name": "Ibuprofen",
            "dosage": "200mg",
            "frequency": "Every 6 hours",
            "duration": "2 days",
            "instructions": "Take after meals"
        }],
        "recommendations": ["Rest", "Hydrate"]
    }"#;

    #[test]
    fn test_no_braces_returns_general_assessment() {
        let result = ResponseExtractor::new().extract("I am not sure what this is.");
        assert_eq!(result.disease, "General Symptom Assessment");
        assert_eq!(result.confidence.value(), 75.0);
        assert_eq!(result.severity, Severity::Medium);
        assert_eq!(result.medicines.len(), 1);
        assert_eq!(result.recommendations.len(), 4);
    }

    #[test]
    fn test_embedded_object_parsed() {
        let raw = format!("noise {} noise", WELL_FORMED);
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.disease, "X");
        assert_eq!(result.confidence.value(), 90.0);
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.medicines[0].name, "Ibuprofen");
        assert_eq!(result.recommendations, vec!["Rest", "Hydrate"]);
    }

    #[test]
    fn test_first_valid_candidate_wins() {
        let raw = format!(
            "Example: {{\"disease\": \"placeholder\"}}\nAnswer: {}\nAlso: {}",
            WELL_FORMED,
            WELL_FORMED.replace("\"X\"", "\"Y\"")
        );
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.disease, "X");
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let raw = r#"{"disease": "Flu", "confidence": 80,}"#;
        let extractor = ResponseExtractor::new();
        assert!(matches!(extractor.try_extract(raw), Err(ExtractionError::Parse(_))));
        assert_eq!(extractor.extract(raw), general_assessment());
    }

    #[test]
    fn test_partial_object_is_shape_mismatch() {
        let raw = r#"{"disease": "Flu", "confidence": 80}"#;
        assert!(matches!(
            ResponseExtractor::new().try_extract(raw),
            Err(ExtractionError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_no_object_error() {
        assert_eq!(
            ResponseExtractor::new().try_extract(""),
            Err(ExtractionError::NoJsonObject)
        );
    }

    #[test]
    fn test_confidence_is_clamped() {
        let raw = WELL_FORMED.replace("\"confidence\": 90", "\"confidence\": 140");
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.disease, "X");
        assert_eq!(result.confidence.value(), 100.0);
    }

    #[test]
    fn test_percent_string_confidence() {
        let raw = WELL_FORMED.replace("\"confidence\": 90", "\"confidence\": \"65%\"");
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.confidence.value(), 65.0);
    }

    #[test]
    fn test_unknown_severity_normalized() {
        let raw = WELL_FORMED.replace("\"High\"", "\"Low|Medium|High|Critical\"");
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.disease, "X");
        assert_eq!(result.severity, Severity::Medium);
    }

    #[test]
    fn test_blank_disease_rejected() {
        let raw = WELL_FORMED.replace("\"X\"", "\"   \"");
        assert!(matches!(
            ResponseExtractor::new().try_extract(&raw),
            Err(ExtractionError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_think_block_ignored() {
        let raw = format!("<think>{{\"disease\": \"draft\"}}</think>{}", WELL_FORMED);
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.disease, "X");
    }

    #[test]
    fn test_echoed_prompt_alone_is_rejected() {
        let prompt = crate::PromptBuilder::new().build(&["fever".to_string()], 30, "male", "");
        let extractor = ResponseExtractor::new();
        assert_eq!(
            extractor.try_extract(&format!(" {}", prompt)),
            Err(ExtractionError::TemplateEcho)
        );
        assert_eq!(extractor.extract(&prompt), general_assessment());
    }

    #[test]
    fn test_answer_after_restated_format_is_used() {
        let prompt = crate::PromptBuilder::new().build(&["fever".to_string()], 30, "male", "");
        let raw = format!("{}\n\nAnswer:\n{}", prompt.replace('\n', "\r\n"), WELL_FORMED);
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.disease, "X");
    }

    #[test]
    fn test_fenced_output_parsed() {
        let raw = format!("```json\n{}\n```", WELL_FORMED);
        let result = ResponseExtractor::new().extract(&raw);
        assert_eq!(result.disease, "X");
    }
}
