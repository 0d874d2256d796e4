//! Source normalization: turning raw payloads into row-indexed records.
//!
//! A payload arrives as bytes plus a declared content type. Normalization
//! reconciles the observed columns against the run's header authority and
//! produces a [`NormalizedSource`]: one canonical header list plus numbered
//! rows whose cells are reordered into canonical column order. All
//! validators over one source see the same normalized view.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{IngestError, Result};
use crate::headers::HeaderAuthority;

mod csv;
mod json;

pub use csv::{normalize_csv, CsvOptions};
pub use json::normalize_json;

/// The `text/csv` content type string.
pub const CONTENT_TYPE_CSV: &str = "text/csv";
/// The `application/json` content type string.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// One data record: an insertion-ordered mapping from column name to cell
/// value. Serializes as a JSON object preserving insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(Vec<(String, Value)>);

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Row(Vec::new())
    }

    /// Appends a column. Existing keys are not checked; callers build rows
    /// from already-unique header lists.
    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        self.0.push((key.into(), value));
    }

    /// Looks up a cell by column name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// True when the column is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Column names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.iter().map(|(k, _)| k)
    }

    /// `(column, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this row with every cell run through the numeric casting
    /// rule, as seen by row-predicate evaluation.
    pub fn casted(&self) -> Row {
        Row(self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), crate::cast::cast_value(v)))
            .collect())
    }

    /// Projects the row as a JSON object, preserving nothing beyond the
    /// key/value content (used by the JSON-logic back-end).
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.0 {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

/// One normalized data row: a 1-based row number plus the reordered cells.
///
/// `cells` holds one value per canonical header, in canonical order; CSV
/// rows longer than the header count keep their surplus values as a literal
/// tail beyond `headers.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// 1-based row number, assigned in document order after the header row.
    pub number: usize,
    /// Cell values in canonical column order, possibly with a surplus tail.
    pub cells: Vec<Value>,
}

impl SourceRow {
    /// The row as a column→value mapping over the canonical headers.
    /// Surplus tail cells have no column name and are not included.
    pub fn record(&self, headers: &[String]) -> Row {
        headers
            .iter()
            .zip(self.cells.iter())
            .map(|(h, v)| (h.clone(), v.clone()))
            .collect()
    }

    /// True when every cell is empty (empty string or null).
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|v| match v {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        })
    }
}

/// A payload normalized to canonical column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedSource {
    /// Canonical header list for this run.
    pub headers: Vec<String>,
    /// Data rows in document order, numbered from 1.
    pub rows: Vec<SourceRow>,
}

/// Normalizes a raw payload according to its declared content type.
///
/// Returns `UnsupportedContentType` (naming `validator`) for anything other
/// than `text/csv` or `application/json`.
pub fn normalize(
    raw: &[u8],
    content_type: &str,
    authority: &HeaderAuthority,
    options: &CsvOptions,
    validator: &str,
) -> Result<NormalizedSource> {
    match content_type {
        CONTENT_TYPE_CSV => normalize_csv(raw, authority, options),
        CONTENT_TYPE_JSON => normalize_json(raw, authority),
        other => Err(IngestError::UnsupportedContentType {
            content_type: other.to_string(),
            validator: validator.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_preserves_insertion_order_when_serialized() {
        let mut row = Row::new();
        row.push("z", json!("1"));
        row.push("a", json!("2"));
        let text = serde_json::to_string(&row).unwrap();
        assert_eq!(text, r#"{"z":"1","a":"2"}"#);
    }

    #[test]
    fn record_ignores_surplus_tail() {
        let row = SourceRow {
            number: 1,
            cells: vec![json!("x"), json!("y"), json!("tail")],
        };
        let headers = vec!["a".to_string(), "b".to_string()];
        let record = row.record(&headers);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("b"), Some(&json!("y")));
    }

    #[test]
    fn unsupported_content_type_names_the_validator() {
        let err = normalize(
            b"",
            "pdf",
            &HeaderAuthority::None,
            &CsvOptions::default(),
            "SqlValidator",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Content type pdf is not supported by SqlValidator"
        );
    }
}
