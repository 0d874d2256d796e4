//! The canonical validation output model.
//!
//! Every validator accumulates findings into a [`ValidatorOutput`] and
//! materializes a single-table [`Report`]. Reports from multiple validators
//! over the same source merge positionally through [`Report::combine`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sources::Row;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Severity {
    /// The row (or table) is invalid.
    #[default]
    Error,
    /// Suspicious but not invalid.
    Warning,
    /// Informational only.
    Info,
}

impl Severity {
    /// Parses the severity strings used in rule documents, defaulting to
    /// `Error` for anything unrecognized.
    pub fn parse(text: &str) -> Self {
        match text {
            "Warning" => Severity::Warning,
            "Info" => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// One validation finding, attached to a row or to the whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity of this issue.
    pub severity: Severity,
    /// Machine-readable code, when the rule declares one.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Column names associated with this issue.
    pub fields: Vec<String>,
}

impl ValidationIssue {
    /// Creates an issue.
    pub fn new(
        severity: Severity,
        code: Option<String>,
        message: impl Into<String>,
        fields: Vec<String>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            fields,
        }
    }

    /// Creates an `Error`-severity issue with no fields.
    pub fn error(code: Option<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message, Vec::new())
    }
}

/// The data carried by one result row: either a tabular record or a raw
/// JSON document (schema validation is not row-oriented).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowData {
    /// A column→value record in canonical order.
    Tabular(Row),
    /// A raw JSON document.
    Document(Value),
}

// Row only implements Serialize; Deserialize for RowData::Tabular goes
// through a JSON object and loses nothing callers rely on.
impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

/// One row of a table result: its number, errors, and data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowEntry {
    /// Row number. 1-based for tabular validators, 0-based for the
    /// JSON-schema validator; consistent within one report.
    pub row_number: usize,
    /// Issues attached to this row.
    pub errors: Vec<ValidationIssue>,
    /// The row's data.
    pub data: RowData,
}

/// The validation outcome for one validator run over one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    /// Canonical header list (empty for document-shaped sources).
    pub headers: Vec<String>,
    /// Issues not attributable to any single row.
    pub whole_table_errors: Vec<ValidationIssue>,
    /// Per-row results in source order.
    pub rows: Vec<RowEntry>,
    /// Count of rows with no errors.
    pub valid_row_count: usize,
    /// Count of rows with at least one error.
    pub invalid_row_count: usize,
}

/// The externally visible validation artifact: exactly one table result
/// (by design) plus an overall validity flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Table results. Non-empty reports hold exactly one table.
    pub tables: Vec<TableResult>,
    /// True iff no row errors and no whole-table errors.
    pub valid: bool,
}

impl Report {
    /// The identity element for [`Report::combine`].
    pub fn empty() -> Self {
        Report {
            tables: Vec::new(),
            valid: true,
        }
    }

    /// True when this report carries no table (the combine identity).
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Merges two reports produced by different validators over the same
    /// rows.
    ///
    /// Either side being empty returns the other unchanged. Otherwise rows
    /// are combined positionally: both inputs must have the same row count
    /// and ordering (a documented precondition, asserted in debug builds).
    /// Left errors precede right errors per row and per table; counts and
    /// validity are always recomputed from the merged error sets.
    pub fn combine(self, other: Report) -> Report {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }

        debug_assert_eq!(self.tables.len(), 1, "reports hold exactly one table");
        debug_assert_eq!(other.tables.len(), 1, "reports hold exactly one table");

        let mut left = self.tables.into_iter().next().expect("non-empty report");
        let right = other.tables.into_iter().next().expect("non-empty report");

        debug_assert_eq!(
            left.rows.len(),
            right.rows.len(),
            "validators over one source must produce the same row count"
        );

        left.whole_table_errors.extend(right.whole_table_errors);
        for (row, other_row) in left.rows.iter_mut().zip(right.rows) {
            row.errors.extend(other_row.errors);
        }

        let valid_row_count = left.rows.iter().filter(|r| r.errors.is_empty()).count();
        left.invalid_row_count = left.rows.len() - valid_row_count;
        left.valid_row_count = valid_row_count;

        let valid = left.invalid_row_count == 0 && left.whole_table_errors.is_empty();
        Report {
            tables: vec![left],
            valid,
        }
    }
}

/// Accumulates findings for one validator run, then materializes a
/// [`Report`].
#[derive(Debug, Default)]
pub struct ValidatorOutput {
    headers: Vec<String>,
    rows: Vec<(usize, RowData)>,
    row_errors: HashMap<usize, Vec<ValidationIssue>>,
    whole_table_errors: Vec<ValidationIssue>,
}

impl ValidatorOutput {
    /// Creates an accumulator over a known row set.
    ///
    /// `rows` pairs each row number with its data; the headers list may be
    /// empty for document-shaped sources.
    pub fn new(rows: Vec<(usize, RowData)>, headers: Vec<String>) -> Self {
        Self {
            headers,
            rows,
            row_errors: HashMap::new(),
            whole_table_errors: Vec::new(),
        }
    }

    /// Appends an issue to one row's error list.
    pub fn add_row_error(&mut self, row_number: usize, issue: ValidationIssue) {
        self.row_errors.entry(row_number).or_default().push(issue);
    }

    /// Appends an issue that applies to the whole table.
    pub fn add_whole_table_error(&mut self, issue: ValidationIssue) {
        self.whole_table_errors.push(issue);
    }

    /// Materializes the accumulated findings against the known row set.
    pub fn into_report(mut self) -> Report {
        let rows: Vec<RowEntry> = self
            .rows
            .into_iter()
            .map(|(row_number, data)| RowEntry {
                row_number,
                errors: self.row_errors.remove(&row_number).unwrap_or_default(),
                data,
            })
            .collect();

        let valid_row_count = rows.iter().filter(|r| r.errors.is_empty()).count();
        let invalid_row_count = rows.len() - valid_row_count;
        let valid = invalid_row_count == 0 && self.whole_table_errors.is_empty();

        Report {
            tables: vec![TableResult {
                headers: self.headers,
                whole_table_errors: self.whole_table_errors,
                rows,
                valid_row_count,
                invalid_row_count,
            }],
            valid,
        }
    }
}
