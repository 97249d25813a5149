//! Rule-based diagnosis used when no model answer is available.
//!
//! Rules are checked in order; the first whose keywords match any symptom
//! decides the result. When none match, the engine returns a generic
//! "requires evaluation" record. Age and gender are part of the interface
//! so rules can use them later, but no current rule does.

use crate::types::{Confidence, DiagnosisResult, Medicine, Severity, SymptomRequest};

const COMMON_COLD_KEYWORDS: &[&str] = &["fever", "headache", "cough", "runny nose"];

/// A single heuristic rule.
pub trait DiagnosisRule: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether this rule applies to the patient.
    fn matches(&self, symptoms: &[String], age: i32, gender: &str) -> bool;

    /// The diagnosis produced when the rule applies.
    fn diagnosis(&self) -> DiagnosisResult;
}

/// Matches when any symptom equals one of the keywords, ignoring case and
/// surrounding whitespace.
pub struct KeywordRule {
    name: &'static str,
    keywords: &'static [&'static str],
    diagnosis: fn() -> DiagnosisResult,
}

impl KeywordRule {
    pub fn new(
        name: &'static str,
        keywords: &'static [&'static str],
        diagnosis: fn() -> DiagnosisResult,
    ) -> Self {
        Self {
            name,
            keywords,
            diagnosis,
        }
    }

    /// Rule for upper respiratory symptoms.
    pub fn common_cold() -> Self {
        Self::new("common_cold", COMMON_COLD_KEYWORDS, common_cold)
    }
}

impl DiagnosisRule for KeywordRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn matches(&self, symptoms: &[String], _age: i32, _gender: &str) -> bool {
        symptoms.iter().any(|symptom| {
            let symptom = symptom.trim().to_lowercase();
            self.keywords.iter().any(|keyword| *keyword == symptom)
        })
    }

    fn diagnosis(&self) -> DiagnosisResult {
        (self.diagnosis)()
    }
}

/// Deterministic fallback diagnosis engine.
pub struct HeuristicDiagnosisEngine {
    rules: Vec<Box<dyn DiagnosisRule>>,
}

impl HeuristicDiagnosisEngine {
    /// Engine with the built-in rule table.
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(KeywordRule::common_cold())],
        }
    }

    /// Engine with a custom rule table. An empty table always yields the
    /// generic evaluation record.
    pub fn with_rules(rules: Vec<Box<dyn DiagnosisRule>>) -> Self {
        Self { rules }
    }

    /// Diagnose from symptoms alone. Never fails.
    pub fn diagnose(&self, symptoms: &[String], age: i32, gender: &str) -> DiagnosisResult {
        match self
            .rules
            .iter()
            .find(|rule| rule.matches(symptoms, age, gender))
        {
            Some(rule) => {
                tracing::debug!(rule = rule.name(), "Heuristic rule matched");
                rule.diagnosis()
            }
            None => requires_evaluation(),
        }
    }

    /// Diagnose a request.
    pub fn diagnose_request(&self, request: &SymptomRequest) -> DiagnosisResult {
        self.diagnose(&request.symptoms, request.age, &request.gender)
    }
}

impl Default for HeuristicDiagnosisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Viral upper respiratory tract infection.
pub fn common_cold() -> DiagnosisResult {
    DiagnosisResult {
        disease: "Common Cold".to_string(),
        confidence: Confidence::new(82.0),
        description: "A viral upper respiratory tract infection commonly caused by rhinovirus. Symptoms typically resolve within 7-10 days.".to_string(),
        severity: Severity::Low,
        medicines: vec![
            Medicine::new(
                "Paracetamol",
                "500mg",
                "Every 6 hours",
                "3-5 days",
                "Take with food to reduce stomach irritation",
            ),
            Medicine::new(
                "Cetirizine",
                "10mg",
                "Once daily",
                "5-7 days",
                "May cause drowsiness, take before bedtime",
            ),
        ],
        recommendations: vec![
            "Get plenty of rest and sleep".to_string(),
            "Drink warm fluids like herbal tea or warm water with honey".to_string(),
            "Use a humidifier or inhale steam to relieve congestion".to_string(),
            "Gargle with warm salt water for sore throat".to_string(),
            "Avoid close contact with others to prevent spreading".to_string(),
            "If symptoms persist beyond 10 days or worsen, consult a doctor".to_string(),
        ],
    }
}

/// Catch-all record directing the patient to professional evaluation.
pub fn requires_evaluation() -> DiagnosisResult {
    DiagnosisResult {
        disease: "Symptom Complex Requiring Evaluation".to_string(),
        confidence: Confidence::new(70.0),
        description: "The combination of symptoms requires professional medical evaluation for accurate diagnosis.".to_string(),
        severity: Severity::Medium,
        medicines: vec![Medicine::new(
            "Paracetamol",
            "500mg",
            "As needed for pain/fever",
            "Short-term use only",
            "Do not exceed 4g per day, take with food",
        )],
        recommendations: vec![
            "Schedule an appointment with a healthcare provider".to_string(),
            "Keep a symptom diary noting when symptoms occur".to_string(),
            "Stay hydrated and get adequate rest".to_string(),
            "Avoid self-medication beyond basic pain relief".to_string(),
            "Seek immediate medical attention if symptoms worsen rapidly".to_string(),
        ],
    }
}
