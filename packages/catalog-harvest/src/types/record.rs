//! Structured records produced by extraction.

use serde_json::{Map, Value};

/// One structured record: named fields to JSON values.
pub type Record = Map<String, Value>;

/// Render a JSON value as a single ledger cell.
///
/// Strings are written bare, `null` becomes an empty cell and nested values
/// are written as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Flatten `value` into `out` as scalar columns.
///
/// Object keys are joined with `_`, array elements are numbered from 1:
/// `{"required_courses": [{"course_code": "CS 101"}]}` becomes
/// `required_courses_1_course_code = "CS 101"`.
pub fn flatten_into(prefix: &str, value: &Value, out: &mut Record) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                flatten_into(&join_key(prefix, key), inner, out);
            }
        }
        Value::Array(items) => {
            for (i, inner) in items.iter().enumerate() {
                flatten_into(&join_key(prefix, &(i + 1).to_string()), inner, out);
            }
        }
        scalar => {
            out.insert(prefix.to_string(), scalar.clone());
        }
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}_{}", prefix, key)
    }
}
