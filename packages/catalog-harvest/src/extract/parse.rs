//! Defensive parsing of model output into records.

use ai_client::strip_code_fence;
use serde_json::Value;

use crate::error::{ExtractError, ExtractResult};
use crate::types::Record;

/// Expected top-level shape of a model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseShape {
    /// One JSON object per item
    #[default]
    Object,

    /// A JSON array of objects; each element becomes a record
    Array,
}

/// Strip fence wrapping, parse as JSON and check the shape.
///
/// Returns the records in response order. An empty array is a valid
/// (empty) result, not a failure.
pub fn parse_records(raw: &str, shape: ResponseShape) -> ExtractResult<Vec<Record>> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(ExtractError::Malformed {
            reason: "empty response".into(),
        });
    }

    let value: Value = serde_json::from_str(body)?;

    match (shape, value) {
        (ResponseShape::Object, Value::Object(map)) => Ok(vec![map]),
        (ResponseShape::Array, Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(ExtractError::Malformed {
                    reason: format!("array element {} is {}, expected object", i, kind(&other)),
                }),
            })
            .collect(),
        (expected, other) => Err(ExtractError::Malformed {
            reason: format!("expected {:?} response, got {}", expected, kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURSE: &str = r#"{"course_number": "CS 101", "credits": "3"}"#;

    #[test]
    fn test_fenced_equals_unfenced() {
        let fenced = format!("```json\n{}\n```", COURSE);
        let plain = parse_records(COURSE, ResponseShape::Object).unwrap();
        let stripped = parse_records(&fenced, ResponseShape::Object).unwrap();

        assert_eq!(plain, stripped);
        assert_eq!(plain[0]["course_number"], "CS 101");
    }

    #[test]
    fn test_bare_fence_without_tag() {
        let fenced = format!("```\n{}\n```", COURSE);
        assert_eq!(parse_records(&fenced, ResponseShape::Object).unwrap().len(), 1);
    }

    #[test]
    fn test_array_shape() {
        let raw = r#"[{"rule": "a"}, {"rule": "b"}]"#;
        let records = parse_records(raw, ResponseShape::Array).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["rule"], "b");

        assert!(parse_records("[]", ResponseShape::Array).unwrap().is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        assert!(matches!(
            parse_records("[1, 2]", ResponseShape::Array),
            Err(ExtractError::Malformed { .. })
        ));
        assert!(matches!(
            parse_records(COURSE, ResponseShape::Array),
            Err(ExtractError::Malformed { .. })
        ));
        assert!(matches!(
            parse_records("[]", ResponseShape::Object),
            Err(ExtractError::Malformed { .. })
        ));
    }

    #[test]
    fn test_freeform_text_is_parse_error() {
        assert!(matches!(
            parse_records("Sorry, I cannot help with that.", ResponseShape::Object),
            Err(ExtractError::JsonParse(_))
        ));
        assert!(matches!(
            parse_records("```json\n```", ResponseShape::Object),
            Err(ExtractError::Malformed { .. })
        ));
    }
}
