//! JSON Schema validation for model-produced diagnoses.
//!
//! Candidate objects are checked against `schema/diagnosis.schema.json`
//! before they are deserialized and normalized.

use std::sync::OnceLock;

/// Embedded diagnosis schema (loaded at compile time).
const DIAGNOSIS_SCHEMA_JSON: &str = include_str!("../../schema/diagnosis.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(DIAGNOSIS_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(|e| e.clone())
}

/// Validate a candidate value against the diagnosis schema.
///
/// Returns every violation found, formatted with its instance path.
pub fn validate_diagnosis_schema(value: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> serde_json::Value {
        json!({
            "disease": "Migraine",
            "confidence": 80,
            "description": "Recurrent headache",
            "severity": "Medium",
            "medicines": [{
                "name": "Ibuprofen",
                "dosage": "400mg",
                "frequency": "Every 8 hours",
                "duration": "3 days",
                "instructions": "Take with food"
            }],
            "recommendations": ["Rest in a dark room"]
        })
    }

    #[test]
    fn test_valid_diagnosis_passes() {
        assert!(validate_diagnosis_schema(&valid()).is_ok());
    }

    #[test]
    fn test_string_confidence_passes() {
        let mut value = valid();
        value["confidence"] = json!("85%");
        assert!(validate_diagnosis_schema(&value).is_ok());
    }

    #[test]
    fn test_word_confidence_fails() {
        let mut value = valid();
        value["confidence"] = json!("high");
        assert!(validate_diagnosis_schema(&value).is_err());
    }

    #[test]
    fn test_missing_field_fails() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("medicines");
        let errors = validate_diagnosis_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_empty_recommendations_fail() {
        let mut value = valid();
        value["recommendations"] = json!([]);
        assert!(validate_diagnosis_schema(&value).is_err());
    }

    #[test]
    fn test_incomplete_medicine_fails() {
        let mut value = valid();
        value["medicines"] = json!([{ "name": "Ibuprofen" }]);
        assert!(validate_diagnosis_schema(&value).is_err());
    }
}
