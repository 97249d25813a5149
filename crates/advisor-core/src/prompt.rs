//! Instruction prompt for the diagnosis model.
//!
//! The template is fixed; only the patient block varies between requests.
//! It carries a JSON example of the expected answer and a safety directive
//! limiting suggestions to over-the-counter medication. The directive is a
//! hint to the model and is not enforced on the output.

use lazy_static::lazy_static;
use serde_json::Value;

use crate::types::SymptomRequest;

/// Rendered in place of an empty medical history.
pub const HISTORY_PLACEHOLDER: &str = "None provided";

const PREAMBLE: &str = "You are a medical AI assistant. Based on the following patient information, provide a medical diagnosis with treatment recommendations.";

const FORMAT_INSTRUCTION: &str = "Please provide your response in the following JSON format:";

const OUTPUT_EXAMPLE: &str = r#"{
    "disease": "Most likely condition name",
    "confidence": 85,
    "description": "Brief medical description of the condition",
    "severity": "Low|Medium|High|Critical",
    "medicines": [
        {
            "name": "Medicine name",
            "dosage": "Dosage amount",
            "frequency": "How often to take",
            "duration": "How long to take",
            "instructions": "Special instructions"
        }
    ],
    "recommendations": [
        "Recommendation 1",
        "Recommendation 2",
        "Recommendation 3"
    ]
}"#;

lazy_static! {
    static ref TEMPLATE_EXAMPLE: Option<Value> = serde_json::from_str(OUTPUT_EXAMPLE).ok();
}

const SAFETY_DIRECTIVE: &str = "Important: Only suggest over-the-counter medications and general care recommendations. Always recommend consulting a healthcare professional for serious conditions.";

/// Renders patient input into the diagnosis prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render the prompt for the given patient details.
    pub fn build(&self, symptoms: &[String], age: i32, gender: &str, history: &str) -> String {
        let symptoms_text = symptoms.join(", ");
        let history = if history.trim().is_empty() {
            HISTORY_PLACEHOLDER
        } else {
            history
        };

        format!(
            "{PREAMBLE}\n\nPatient Information:\n- Age: {age}\n- Gender: {gender}\n- Symptoms: {symptoms_text}\n- Medical History: {history}\n\n{FORMAT_INSTRUCTION}\n{OUTPUT_EXAMPLE}\n\n{SAFETY_DIRECTIVE}"
        )
    }

    /// Render the prompt for a request.
    pub fn build_for(&self, request: &SymptomRequest) -> String {
        self.build(
            &request.symptoms,
            request.age,
            &request.gender,
            request.history(),
        )
    }
}

/// Whether a JSON object is the prompt's output example rather than an answer.
///
/// Matches when the disease or any medicine name is still the example's
/// placeholder text.
pub fn is_template_example(value: &Value) -> bool {
    let Some(example) = TEMPLATE_EXAMPLE.as_ref() else {
        return false;
    };

    let same_text = |a: &Value, b: &Value| match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    };

    if value == example || same_text(&value["disease"], &example["disease"]) {
        return true;
    }

    let placeholder = &example["medicines"][0]["name"];
    value["medicines"]
        .as_array()
        .is_some_and(|medicines| medicines.iter().any(|m| same_text(&m["name"], placeholder)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symptoms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_patient_block_substitution() {
        let prompt = PromptBuilder::new().build(
            &symptoms(&["fever", "sore throat"]),
            42,
            "female",
            "Type 2 diabetes",
        );

        assert!(prompt.contains("- Age: 42\n"));
        assert!(prompt.contains("- Gender: female\n"));
        assert!(prompt.contains("- Symptoms: fever, sore throat\n"));
        assert!(prompt.contains("- Medical History: Type 2 diabetes\n"));
    }

    #[test]
    fn test_empty_history_uses_placeholder() {
        let builder = PromptBuilder::new();
        let prompt = builder.build(&symptoms(&["cough"]), 30, "male", "");
        assert!(prompt.contains("- Medical History: None provided\n"));

        let prompt = builder.build(&symptoms(&["cough"]), 30, "male", "   ");
        assert!(prompt.contains("- Medical History: None provided\n"));
    }

    #[test]
    fn test_empty_symptoms_render_empty_clause() {
        let prompt = PromptBuilder::new().build(&[], 30, "male", "");
        assert!(prompt.contains("- Symptoms: \n"));
    }

    #[test]
    fn test_template_carries_format_and_safety() {
        let prompt = PromptBuilder::new().build(&symptoms(&["cough"]), 30, "male", "");
        assert!(prompt.starts_with("You are a medical AI assistant."));
        assert!(prompt.contains("\"severity\": \"Low|Medium|High|Critical\""));
        assert!(prompt.contains("\"recommendations\": ["));
        assert!(prompt.ends_with("consulting a healthcare professional for serious conditions."));
    }

    #[test]
    fn test_build_for_request_matches_build() {
        let request = SymptomRequest::new(symptoms(&["headache"]), 25, "male").with_history("none");
        let builder = PromptBuilder::new();
        assert_eq!(
            builder.build_for(&request),
            builder.build(&request.symptoms, 25, "male", "none")
        );
    }

    #[test]
    fn test_output_example_is_recognized() {
        let example: Value = serde_json::from_str(OUTPUT_EXAMPLE).unwrap();
        assert!(is_template_example(&example));

        let mut restated = example.clone();
        restated["disease"] = Value::from("  most likely condition name ");
        restated["confidence"] = Value::from(60);
        assert!(is_template_example(&restated));

        let mut placeholder_medicine = example.clone();
        placeholder_medicine["disease"] = Value::from("Influenza");
        assert!(is_template_example(&placeholder_medicine));
    }

    #[test]
    fn test_real_answer_is_not_template() {
        let answer = serde_json::json!({
            "disease": "Influenza",
            "medicines": [{ "name": "Paracetamol" }],
        });
        assert!(!is_template_example(&answer));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let builder = PromptBuilder::new();
        let a = builder.build(&symptoms(&["fatigue"]), 61, "female", "");
        let b = builder.build(&symptoms(&["fatigue"]), 61, "female", "");
        assert_eq!(a, b);
    }
}
