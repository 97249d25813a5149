//! Request and result types shared by every diagnosis path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Patient input for a single diagnosis request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomRequest {
    /// Reported symptoms, in the order the patient gave them
    pub symptoms: Vec<String>,

    /// Age in years
    pub age: i32,

    /// Free-text gender
    pub gender: String,

    /// Optional free-text medical history
    #[serde(default)]
    pub medical_history: Option<String>,
}

impl SymptomRequest {
    /// Create a request without medical history.
    pub fn new(symptoms: Vec<String>, age: i32, gender: impl Into<String>) -> Self {
        Self {
            symptoms,
            age,
            gender: gender.into(),
            medical_history: None,
        }
    }

    /// Attach medical history.
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.medical_history = Some(history.into());
        self
    }

    /// Medical history, or the empty string when none was given.
    pub fn history(&self) -> &str {
        self.medical_history.as_deref().unwrap_or("")
    }
}

/// A suggested medicine with dosing guidance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
}

impl Medicine {
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        frequency: impl Into<String>,
        duration: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dosage: dosage.into(),
            frequency: frequency.into(),
            duration: duration.into(),
            instructions: instructions.into(),
        }
    }
}

/// Severity of a diagnosed condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a free-text severity label.
    ///
    /// Matching is case-insensitive and accepts common synonyms. Labels
    /// that map to nothing return `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "mild" | "minor" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" | "severe" | "serious" => Some(Self::High),
            "critical" | "emergency" | "life-threatening" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Parse a label, normalizing anything unrecognized to `Medium`.
    pub fn parse_or_medium(label: &str) -> Self {
        Self::parse(label).unwrap_or_else(|| {
            tracing::debug!(label = %label, "Unrecognized severity, normalizing to Medium");
            Self::Medium
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence score in the closed range 0-100.
///
/// Construction always clamps; NaN becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

/// Structured diagnosis returned to the caller.
///
/// Every path through the pipeline ends in one of these, fully populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisResult {
    /// Most likely condition
    pub disease: String,

    /// Confidence, 0-100
    pub confidence: Confidence,

    /// Short description of the condition
    pub description: String,

    pub severity: Severity,

    /// Suggested medicines, in presentation order
    pub medicines: Vec<Medicine>,

    /// General care recommendations
    pub recommendations: Vec<String>,
}

impl DiagnosisResult {
    /// True when no field is empty.
    pub fn is_complete(&self) -> bool {
        !self.disease.trim().is_empty()
            && !self.medicines.is_empty()
            && !self.recommendations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamps() {
        assert_eq!(Confidence::new(150.0).value(), 100.0);
        assert_eq!(Confidence::new(-3.0).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::new(42.5).value(), 42.5);
    }

    #[test]
    fn test_confidence_deserialize_clamps() {
        let c: Confidence = serde_json::from_str("250").unwrap();
        assert_eq!(c.value(), 100.0);
    }

    #[test]
    fn test_severity_parse_synonyms() {
        assert_eq!(Severity::parse("LOW"), Some(Severity::Low));
        assert_eq!(Severity::parse(" moderate "), Some(Severity::Medium));
        assert_eq!(Severity::parse("Severe"), Some(Severity::High));
        assert_eq!(Severity::parse("emergency"), Some(Severity::Critical));
        assert_eq!(Severity::parse("Low|Medium|High|Critical"), None);
        assert_eq!(Severity::parse_or_medium("unknown"), Severity::Medium);
    }

    #[test]
    fn test_severity_wire_format() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"Critical\"");
    }

    #[test]
    fn test_request_history_defaults_empty() {
        let request: SymptomRequest =
            serde_json::from_str(r#"{"symptoms":["cough"],"age":30,"gender":"male"}"#).unwrap();
        assert_eq!(request.history(), "");

        let request = request.with_history("asthma");
        assert_eq!(request.history(), "asthma");
    }
}
