//! Tabular shape checks: blank headers, header/schema mismatches, blank
//! rows, and surplus values.
//!
//! These are the structural findings that the structural validator re-maps
//! onto the canonical row set. Each finding carries an optional row number
//! (row-scoped vs whole-table) and an optional column number.

use crate::sources::NormalizedSource;

/// One structural finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeFinding {
    /// Stable finding code (`blank-row`, `extra-value`, ...).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// 1-based data row, when the finding is row-scoped.
    pub row_number: Option<usize>,
    /// 1-based column, when the finding points at one.
    pub column_number: Option<usize>,
}

impl ShapeFinding {
    fn table(code: &str, message: String, column: usize) -> Self {
        Self {
            code: code.to_string(),
            message,
            row_number: None,
            column_number: Some(column),
        }
    }

    fn row(code: &str, message: String, row: usize, column: Option<usize>) -> Self {
        Self {
            code: code.to_string(),
            message,
            row_number: Some(row),
            column_number: column,
        }
    }
}

/// Runs the shape checks over a normalized source.
///
/// `schema_fields`, when declared, is compared against the canonical
/// headers to report extra and missing headers. Short rows are already
/// padded by normalization and are not findings.
pub fn check(source: &NormalizedSource, schema_fields: Option<&[String]>) -> Vec<ShapeFinding> {
    let mut findings = Vec::new();
    let width = source.headers.len();

    for (index, header) in source.headers.iter().enumerate() {
        if header.trim().is_empty() {
            findings.push(ShapeFinding::table(
                "blank-header",
                format!("Header in column {} is blank", index + 1),
                index + 1,
            ));
        }
    }

    if let Some(fields) = schema_fields {
        if !fields.is_empty() {
            for (index, header) in source.headers.iter().enumerate() {
                if !fields.iter().any(|f| f == header) {
                    findings.push(ShapeFinding::table(
                        "extra-header",
                        format!("There is an extra header in column {}", index + 1),
                        index + 1,
                    ));
                }
            }
            for (index, field) in fields.iter().enumerate() {
                if !source.headers.iter().any(|h| h == field) {
                    findings.push(ShapeFinding::table(
                        "missing-header",
                        format!("There is a missing header in column {}", index + 1),
                        index + 1,
                    ));
                }
            }
        }
    }

    for row in &source.rows {
        if row.is_blank() {
            findings.push(ShapeFinding::row(
                "blank-row",
                format!("Row {} is completely blank", row.number),
                row.number,
                None,
            ));
            continue;
        }
        for (index, _cell) in row.cells.iter().enumerate().skip(width) {
            findings.push(ShapeFinding::row(
                "extra-value",
                format!(
                    "Row {} has an extra value in column {}",
                    row.number,
                    index + 1
                ),
                row.number,
                Some(index + 1),
            ));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderAuthority;
    use crate::sources::{normalize_csv, CsvOptions};

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn normalize(text: &[u8]) -> NormalizedSource {
        normalize_csv(text, &HeaderAuthority::None, &CsvOptions::default()).unwrap()
    }

    #[test]
    fn reports_blank_and_ragged_rows() {
        let source = normalize(b"Name,Title,level\nGuido,BDFL,20\n\nCatherine,,9,DBA\n,\nTony,Engineer,10\n");
        let findings = check(&source, None);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].code, "blank-row");
        assert_eq!(findings[0].message, "Row 2 is completely blank");
        assert_eq!(findings[1].code, "extra-value");
        assert_eq!(
            findings[1].message,
            "Row 3 has an extra value in column 4"
        );
        assert_eq!(findings[1].column_number, Some(4));
        assert_eq!(findings[2].code, "blank-row");
        assert_eq!(findings[2].message, "Row 4 is completely blank");
    }

    #[test]
    fn reports_extra_headers_against_the_schema() {
        let source =
            normalize(b"category,dollars_budgeted,dollars_spent,extra1,extra2\npencils,1,500,2,400");
        let fields = strings(&["category", "dollars_budgeted", "dollars_spent"]);
        let findings = check(&source, Some(&fields));
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].code, "extra-header");
        assert_eq!(findings[0].message, "There is an extra header in column 4");
        assert!(findings[0].row_number.is_none());
        assert_eq!(findings[1].message, "There is an extra header in column 5");
    }

    #[test]
    fn reports_missing_headers_against_the_schema() {
        let source = normalize(b"a,c\n1,2\n");
        let fields = strings(&["a", "b", "c"]);
        let findings = check(&source, Some(&fields));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "missing-header");
        assert_eq!(findings[0].message, "There is a missing header in column 2");
    }

    #[test]
    fn reports_blank_headers() {
        let source = normalize(b"a,,c\n1,2,3\n");
        let findings = check(&source, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "blank-header");
        assert_eq!(findings[0].message, "Header in column 2 is blank");
    }

    #[test]
    fn clean_source_has_no_findings() {
        let source = normalize(b"a,b\n1,2\n3,4\n");
        assert!(check(&source, None).is_empty());
    }
}
