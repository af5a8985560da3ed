//! JSON-array ledger.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{LedgerError, LedgerResult};
use crate::types::Record;

/// Existing entries, or an empty list when the file is absent or blank.
///
/// Anything that is not a JSON array is reported as corrupt rather than
/// treated as empty.
pub fn read_values(path: &Path) -> LedgerResult<Vec<Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LedgerError::io(path, e)),
    };

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(LedgerError::Corrupt {
            path: path.to_path_buf(),
            reason: "top-level value is not an array".into(),
        }),
        Err(e) => Err(LedgerError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Read entries that must all be objects.
pub fn read(path: &Path) -> LedgerResult<Vec<Record>> {
    read_values(path)?
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            Value::Object(map) => Ok(map),
            _ => Err(LedgerError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("entry {} is not an object", i + 1),
            }),
        })
        .collect()
}

/// Render `existing` followed by `records` as a pretty-printed array.
pub fn render(existing: Vec<Value>, records: &[Record]) -> LedgerResult<Vec<u8>> {
    let mut all = existing;
    all.extend(records.iter().cloned().map(Value::Object));
    let mut bytes = serde_json::to_vec_pretty(&all)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_and_blank_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_values(&dir.path().join("none.json")).unwrap().is_empty());

        let blank = dir.path().join("blank.json");
        fs::write(&blank, "  \n").unwrap();
        assert!(read_values(&blank).unwrap().is_empty());
    }

    #[test]
    fn test_non_array_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.json");
        fs::write(&path, r#"{"a": 1}"#).unwrap();
        assert!(matches!(read_values(&path), Err(LedgerError::Corrupt { .. })));

        fs::write(&path, "[{\"a\": 1},").unwrap();
        assert!(matches!(read_values(&path), Err(LedgerError::Corrupt { .. })));
    }

    #[test]
    fn test_read_requires_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        fs::write(&path, r#"[{"a": 1}, 2]"#).unwrap();
        assert!(matches!(read(&path), Err(LedgerError::Corrupt { .. })));
    }

    #[test]
    fn test_render_appends_after_existing() {
        let existing = vec![json!({"n": 1}), json!("kept as-is")];
        let mut record = Record::new();
        record.insert("n".into(), json!(2));

        let bytes = render(existing, &[record]).unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, json!([{"n": 1}, "kept as-is", {"n": 2}]));
    }
}
