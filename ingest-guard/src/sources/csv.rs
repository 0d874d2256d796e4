//! CSV normalization.
//!
//! The reader is header-aware and deliberately non-strict: short rows are
//! padded, long rows keep their surplus values as a literal tail, and blank
//! lines are preserved as blank rows rather than silently dropped.

use serde_json::Value;

use crate::error::{IngestError, Result};
use crate::headers::{reconcile, HeaderAuthority};

use super::{NormalizedSource, SourceRow, CONTENT_TYPE_CSV};

/// Stream-parsing options for CSV payloads.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    /// Field delimiter. Defaults to `,`.
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

fn parse_error(message: impl Into<String>) -> IngestError {
    IngestError::SourceParse {
        content_type: CONTENT_TYPE_CSV.to_string(),
        message: message.into(),
    }
}

/// Replaces every physical line consisting solely of whitespace with a
/// single delimiter, so the reader emits an empty record instead of
/// suppressing the line entirely.
fn preserve_blank_lines(text: &str, delimiter: u8) -> String {
    let sentinel = (delimiter as char).to_string();
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                sentinel.as_str()
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalizes a CSV payload into canonical column order.
///
/// The first record supplies the observed headers. With an `Explicit`
/// authority the header row is replaced verbatim and data rows pass through
/// positionally; otherwise cells are re-keyed by observed header and
/// re-emitted in reconciled order, with missing cells becoming `""` and
/// surplus cells appended as a tail.
pub fn normalize_csv(
    raw: &[u8],
    authority: &HeaderAuthority,
    options: &CsvOptions,
) -> Result<NormalizedSource> {
    let text = std::str::from_utf8(raw).map_err(|e| parse_error(format!("invalid UTF-8: {e}")))?;

    if text.trim().is_empty() {
        let headers = match authority {
            HeaderAuthority::Explicit(list) => list.clone(),
            _ => Vec::new(),
        };
        return Ok(NormalizedSource {
            headers,
            rows: Vec::new(),
        });
    }

    let prepared = preserve_blank_lines(text, options.delimiter);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(prepared.as_bytes());

    let mut records = reader.records();
    let observed: Vec<String> = match records.next() {
        Some(first) => first
            .map_err(|e| parse_error(e.to_string()))?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => Vec::new(),
    };

    let headers = reconcile(&observed, authority);
    let mut rows = Vec::new();

    for (index, record) in records.enumerate() {
        let record = record.map_err(|e| parse_error(e.to_string()))?;
        let values: Vec<&str> = record.iter().collect();

        let cells: Vec<Value> = if authority.is_explicit() {
            // Positional passthrough: the configured list names the columns
            // the data already has, in order.
            let mut cells: Vec<Value> = values
                .iter()
                .map(|v| Value::String(v.to_string()))
                .collect();
            while cells.len() < headers.len() {
                cells.push(Value::String(String::new()));
            }
            cells
        } else {
            let mut cells: Vec<Value> = headers
                .iter()
                .map(|header| {
                    let value = observed
                        .iter()
                        .position(|h| h == header)
                        .and_then(|pos| values.get(pos).copied())
                        .unwrap_or("");
                    Value::String(value.to_string())
                })
                .collect();
            // Values beyond the observed header count have no column name;
            // keep them as a literal tail instead of raising.
            for surplus in values.iter().skip(observed.len()) {
                cells.push(Value::String(surplus.to_string()));
            }
            cells
        };

        rows.push(SourceRow {
            number: index + 1,
            cells,
        });
    }

    Ok(NormalizedSource { headers, rows })
}
