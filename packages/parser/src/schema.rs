use jsonschema::Validator;
use serde_json::Value;

use crate::error::{ParserError, Result};

const SCHEMA_JSON: &str = include_str!("../schema/document.schema.json");

/// Validates serialized documents against the output JSON schema.
pub struct SchemaValidator {
    validator: Validator,
}

impl SchemaValidator {
    /// Compile the embedded document schema.
    pub fn new() -> Result<Self> {
        let schema: Value =
            serde_json::from_str(SCHEMA_JSON).map_err(|e| ParserError::SchemaLoad(e.to_string()))?;

        let validator = Validator::new(&schema)
            .map_err(|e| ParserError::SchemaLoad(format!("failed to compile schema: {e}")))?;

        Ok(Self { validator })
    }

    /// Validate a serialized document.
    ///
    /// Returns `Ok(())` if valid, or `Err(SchemaValidation)` with one message
    /// per violation. Messages start with the instance path; violations
    /// inside the section tree also name the enclosing sections, outermost
    /// first.
    pub fn validate(&self, value: &Value) -> Result<()> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path().to_string();
                let trail = section_trail(value, &path);
                match (path.is_empty(), trail.is_empty()) {
                    (true, _) => e.to_string(),
                    (false, true) => format!("{path}: {e}"),
                    (false, false) => format!("{path} (section {}): {e}", trail.join(" > ")),
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ParserError::SchemaValidation { errors })
        }
    }
}

/// Labels of the sections a JSON pointer passes through.
///
/// A section is labelled by its numbering, then its header text, then its
/// position among its siblings.
fn section_trail(document: &Value, pointer: &str) -> Vec<String> {
    let mut trail = Vec::new();
    let mut current = document;
    let mut in_section_list = false;

    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Object(map) => map.get(&token),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        let Some(next) = next else {
            break;
        };

        if in_section_list {
            trail.push(section_label(next, &token));
        }
        in_section_list = matches!(current, Value::Object(_))
            && matches!(token.as_str(), "sections" | "subsections");
        current = next;
    }

    trail
}

fn section_label(section: &Value, index: &str) -> String {
    let numbering = section["numbering"].as_str().filter(|n| !n.is_empty());
    let header = section["header"]["text"].as_str().filter(|h| !h.is_empty());
    numbering
        .or(header)
        .map_or_else(|| format!("#{index}"), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "corpusid": 1,
            "externalids": {"DOI": null, "ArXiv": "2101.00001"},
            "title": null,
            "abstract": {"start": 0, "end": 4, "text": "Abst"},
            "sections": [],
            "bibliography": {},
            "figures": {},
            "tables": {},
            "formulas": {}
        })
    }

    #[test]
    fn test_validator_creation() {
        let validator = SchemaValidator::new();
        assert!(validator.is_ok(), "Schema validator should be created successfully");
    }

    #[test]
    fn test_minimal_document_is_valid() {
        let validator = SchemaValidator::new().expect("validator");
        assert!(validator.validate(&minimal()).is_ok());
    }

    #[test]
    fn test_nested_sections_are_valid() {
        let validator = SchemaValidator::new().expect("validator");
        let mut doc = minimal();
        doc["sections"] = json!([{
            "numbering": "1",
            "header": {"start": 0, "end": 7, "text": "1 Intro"},
            "paragraphs": [],
            "subsections": [{
                "numbering": "1.1",
                "header": null,
                "subsections": [],
                "paragraphs": [{
                    "start": 8,
                    "end": 20,
                    "text": "See [1] now.",
                    "refs": [{
                        "ref_id": null,
                        "ref_type": "bibref",
                        "start": 12,
                        "end": 15,
                        "text": "[1]",
                        "relative_start": 4,
                        "relative_end": 7
                    }]
                }]
            }]
        }]);
        doc["bibliography"] = json!({
            "unref_0": {
                "ref_id": "unref_0",
                "text": "Smith 2020",
                "start": 30,
                "end": 40,
                "corpusid": null,
                "externalids": {}
            }
        });

        let result = validator.validate(&doc);
        assert!(result.is_ok(), "unexpected errors: {result:?}");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let validator = SchemaValidator::new().expect("validator");
        let mut doc = minimal();
        doc.as_object_mut().expect("object").remove("formulas");

        assert!(matches!(
            validator.validate(&doc),
            Err(ParserError::SchemaValidation { .. })
        ));
    }

    #[test]
    fn test_empty_section_is_rejected() {
        let validator = SchemaValidator::new().expect("validator");
        let mut doc = minimal();
        doc["sections"] = json!([{
            "numbering": "",
            "header": null,
            "subsections": [],
            "paragraphs": []
        }]);

        match validator.validate(&doc) {
            Err(ParserError::SchemaValidation { errors }) => {
                assert!(errors.iter().all(|e| e.starts_with("/sections/0 (section #0): ")));
            }
            other => panic!("expected schema validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_errors_name_enclosing_sections() {
        let validator = SchemaValidator::new().expect("validator");
        let mut doc = minimal();
        doc["sections"] = json!([{
            "numbering": "",
            "header": {"start": 0, "end": 7, "text": "Methods"},
            "paragraphs": [],
            "subsections": [{
                "numbering": "2.1",
                "header": null,
                "subsections": [],
                "paragraphs": [{"start": 8, "end": "20", "text": "Body", "refs": []}]
            }]
        }]);

        match validator.validate(&doc) {
            Err(ParserError::SchemaValidation { errors }) => {
                assert_eq!(errors.len(), 1, "unexpected errors: {errors:?}");
                assert!(errors[0].starts_with(
                    "/sections/0/subsections/0/paragraphs/0/end (section Methods > 2.1): "
                ));
            }
            other => panic!("expected schema validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_errors_carry_instance_path() {
        let validator = SchemaValidator::new().expect("validator");
        let mut doc = minimal();
        doc["figures"] = json!({"f1": {"ref_id": "f1", "text": "Fig", "start": -1, "end": 3}});

        match validator.validate(&doc) {
            Err(ParserError::SchemaValidation { errors }) => {
                assert!(errors.iter().any(|e| e.starts_with("/figures/f1/start")));
            }
            other => panic!("expected schema validation error, got {other:?}"),
        }
    }
}
