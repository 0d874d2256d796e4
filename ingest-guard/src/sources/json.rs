//! JSON-array normalization.
//!
//! Payloads are arrays of flat objects. Observed headers are the union of
//! all keys across all objects, in order of first appearance; missing keys
//! become null cells.

use serde_json::Value;

use crate::error::{IngestError, Result};
use crate::headers::{reconcile, HeaderAuthority};

use super::{NormalizedSource, SourceRow, CONTENT_TYPE_JSON};

fn parse_error(message: impl Into<String>) -> IngestError {
    IngestError::SourceParse {
        content_type: CONTENT_TYPE_JSON.to_string(),
        message: message.into(),
    }
}

/// Normalizes a JSON payload (an array of flat objects) into canonical
/// column order. With an `Explicit` authority, keys outside the configured
/// list are dropped; otherwise reconciliation keeps every observed key.
pub fn normalize_json(raw: &[u8], authority: &HeaderAuthority) -> Result<NormalizedSource> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| parse_error(e.to_string()))?;

    let objects = match value {
        Value::Array(items) => items,
        other => {
            return Err(parse_error(format!(
                "expected an array of objects, got {}",
                value_kind(&other)
            )))
        }
    };

    let mut observed: Vec<String> = Vec::new();
    for (index, item) in objects.iter().enumerate() {
        let object = item.as_object().ok_or_else(|| {
            parse_error(format!(
                "expected an object at index {index}, got {}",
                value_kind(item)
            ))
        })?;
        for key in object.keys() {
            if !observed.iter().any(|k| k == key) {
                observed.push(key.clone());
            }
        }
    }

    let headers = reconcile(&observed, authority);
    let rows = objects
        .iter()
        .enumerate()
        .map(|(index, item)| {
            // Validated as an object above.
            let object = item.as_object().expect("array items checked");
            let cells = headers
                .iter()
                .map(|header| object.get(header).cloned().unwrap_or(Value::Null))
                .collect();
            SourceRow {
                number: index + 1,
                cells,
            }
        })
        .collect();

    Ok(NormalizedSource { headers, rows })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn headers_are_the_union_of_keys_in_first_appearance_order() {
        let raw = serde_json::to_vec(&json!([
            {"name": "Guido", "title": "BDFL", "level": 20},
            {"name": "Catherine", "level": 9},
            {"name": "Tony", "title": "Engineer", "level": 20},
        ]))
        .unwrap();
        let source = normalize_json(&raw, &HeaderAuthority::None).unwrap();
        assert_eq!(source.headers, strings(&["name", "title", "level"]));
        assert_eq!(source.rows.len(), 3);
        assert_eq!(source.rows[1].number, 2);
        // Missing keys are filled with null.
        assert_eq!(source.rows[1].cells, vec![json!("Catherine"), Value::Null, json!(9)]);
    }

    #[test]
    fn keys_unknown_to_the_schema_are_kept() {
        let raw = serde_json::to_vec(&json!([
            {"col1": 1, "col2": 2, "col4": 4},
            {"col1": 1, "col3": 3},
        ]))
        .unwrap();
        let authority = HeaderAuthority::Schema(strings(&["col1", "col2", "col3"]));
        let source = normalize_json(&raw, &authority).unwrap();
        assert_eq!(source.headers, strings(&["col1", "col2", "col3", "col4"]));
        assert_eq!(
            source.rows[0].cells,
            vec![json!(1), json!(2), Value::Null, json!(4)]
        );
    }

    #[test]
    fn explicit_headers_drop_unlisted_keys() {
        let raw = serde_json::to_vec(&json!([{"a": 1, "z": 26}])).unwrap();
        let authority = HeaderAuthority::Explicit(strings(&["a", "b"]));
        let source = normalize_json(&raw, &authority).unwrap();
        assert_eq!(source.headers, strings(&["a", "b"]));
        assert_eq!(source.rows[0].cells, vec![json!(1), Value::Null]);
    }

    #[test]
    fn non_array_payloads_are_parse_errors() {
        let err = normalize_json(br#"{"a": 1}"#, &HeaderAuthority::None).unwrap_err();
        assert!(err.to_string().contains("expected an array"));

        let err = normalize_json(br#"[1, 2]"#, &HeaderAuthority::None).unwrap_err();
        assert!(err.to_string().contains("expected an object at index 0"));
    }
}
