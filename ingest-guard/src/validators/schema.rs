//! The JSON-Schema validator: document-shaped payload validation.
//!
//! Unlike the tabular validators this one performs no column
//! reconciliation; rows are the array items themselves (a lone object is
//! wrapped into a one-element array) and are numbered from 0.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::error::{IngestError, Result};
use crate::output::{Report, RowData, Severity, ValidationIssue, ValidatorOutput};
use crate::sources::CONTENT_TYPE_JSON;
use crate::validators::Validator;

/// Validates JSON payloads against a schema compiled once at construction.
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compiles the schema document. An invalid schema is a configuration
    /// error.
    pub fn new(document: &Value) -> Result<Self> {
        let compiled = jsonschema::validator_for(document).map_err(|e| {
            IngestError::configuration(format!("JsonschemaValidator has an invalid schema: {e}"))
        })?;
        Ok(Self { compiled })
    }
}

/// Splits a JSON-pointer-style location (`/0/name`) into its segments.
fn path_segments(location: &str) -> Vec<String> {
    location
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Validator for SchemaValidator {
    #[instrument(skip(self, raw), fields(validator = self.name()))]
    async fn validate(&self, raw: &[u8], content_type: &str) -> Result<Report> {
        if content_type != CONTENT_TYPE_JSON {
            return Err(IngestError::UnsupportedContentType {
                content_type: content_type.to_string(),
                validator: self.name().to_string(),
            });
        }

        let source: Value = serde_json::from_slice(raw).map_err(|e| IngestError::SourceParse {
            content_type: CONTENT_TYPE_JSON.to_string(),
            message: e.to_string(),
        })?;

        // A lone object is validated as a one-element array; either way
        // rows are the items, numbered from 0.
        let rows: Vec<(usize, RowData)> = match &source {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (i, RowData::Document(item.clone())))
                .collect(),
            other => vec![(0, RowData::Document(other.clone()))],
        };
        let mut output = ValidatorOutput::new(rows, Vec::new());

        for violation in self.compiled.iter_errors(&source) {
            let instance_path = path_segments(&violation.instance_path.to_string());
            let code = path_segments(&violation.schema_path.to_string())
                .last()
                .cloned();
            let message = violation.to_string();

            let (row_number, fields) = match instance_path.split_first() {
                None => (0, Vec::new()),
                Some((first, rest)) => match first.parse::<usize>() {
                    // Array sources: the leading segment is the item index.
                    Ok(index) => (index, rest.to_vec()),
                    // Single-object sources: every segment names a field.
                    Err(_) => (0, instance_path.clone()),
                },
            };

            output.add_row_error(
                row_number,
                ValidationIssue::new(Severity::Error, code, message, fields),
            );
        }

        Ok(output.into_report())
    }

    fn name(&self) -> &str {
        "JsonschemaValidator"
    }
}
