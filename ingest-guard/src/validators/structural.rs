//! The structural validator: shape checks re-mapped onto canonical rows.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::headers::HeaderAuthority;
use crate::output::{Report, RowData, Severity, ValidationIssue, ValidatorOutput};
use crate::rules::schema_field_names;
use crate::shape::{self, ShapeFinding};
use crate::sources::{normalize, CsvOptions};
use crate::validators::Validator;

/// Validates tabular shape: blank headers, schema header mismatches, blank
/// rows, and surplus values.
///
/// Findings with a row number become row errors; findings with a column
/// number inside the canonical width get the header name interpolated into
/// their message and recorded in `fields`; findings with no row number
/// become whole-table errors.
#[derive(Debug)]
pub struct StructuralValidator {
    fields: Vec<String>,
    authority: HeaderAuthority,
    csv: CsvOptions,
}

impl StructuralValidator {
    /// Creates the validator from its schema document (`fields: [{name}]`).
    pub fn new(document: &Value, authority: HeaderAuthority, csv: CsvOptions) -> Result<Self> {
        Ok(Self {
            fields: schema_field_names(document),
            authority,
            csv,
        })
    }

    /// Declared schema field names, used as the run's header preference
    /// ordering.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

fn issue_from_finding(finding: &ShapeFinding, headers: &[String]) -> ValidationIssue {
    let mut message = finding.message.clone();
    let mut fields = Vec::new();
    if let Some(column) = finding.column_number {
        if column <= headers.len() {
            let header = &headers[column - 1];
            let plain = format!("column {column}");
            message = message.replace(&plain, &format!("{plain} ({header})"));
            fields.push(header.clone());
        }
    }
    ValidationIssue::new(Severity::Error, Some(finding.code.clone()), message, fields)
}

#[async_trait]
impl Validator for StructuralValidator {
    #[instrument(skip(self, raw), fields(validator = self.name()))]
    async fn validate(&self, raw: &[u8], content_type: &str) -> Result<Report> {
        let source = normalize(raw, content_type, &self.authority, &self.csv, self.name())?;

        let schema_fields = if self.fields.is_empty() {
            None
        } else {
            Some(self.fields.as_slice())
        };
        let findings = shape::check(&source, schema_fields);

        let rows = source
            .rows
            .iter()
            .map(|row| (row.number, RowData::Tabular(row.record(&source.headers))))
            .collect();
        let mut output = ValidatorOutput::new(rows, source.headers.clone());

        for finding in &findings {
            let issue = issue_from_finding(finding, &source.headers);
            match finding.row_number {
                Some(row) => output.add_row_error(row, issue),
                None => output.add_whole_table_error(issue),
            }
        }

        Ok(output.into_report())
    }

    fn name(&self) -> &str {
        "StructuralValidator"
    }
}
