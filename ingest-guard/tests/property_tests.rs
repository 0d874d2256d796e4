//! Property-based tests for the validation engine's core algebra.
//!
//! Uses proptest to verify invariants that must hold for arbitrary inputs:
//! header reconciliation stability, report combination algebra, numeric
//! casting, and CSV normalization row accounting.

use proptest::prelude::*;

use ingest_guard::cast::{cast_str, cast_value};
use ingest_guard::headers::{reconcile, HeaderAuthority};
use ingest_guard::output::{Report, RowData, ValidationIssue, ValidatorOutput};
use ingest_guard::sources::{normalize, CsvOptions, CONTENT_TYPE_CSV};
use serde_json::json;

// ============================================================================
// Generators
// ============================================================================

/// Simple lowercase identifiers, so header comparisons are by value and not
/// confounded by whitespace or quoting.
fn header_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn header_list(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(header_name(), 0..max).prop_map(|names| {
        let mut seen = std::collections::HashSet::new();
        names.into_iter().filter(|n| seen.insert(n.clone())).collect()
    })
}

/// Builds a report over `row_count` rows where each row carries the given
/// number of errors.
fn report_with(row_count: usize, errors_per_row: &[usize]) -> Report {
    let rows = (1..=row_count)
        .map(|n| (n, RowData::Document(json!({"row": n}))))
        .collect();
    let mut output = ValidatorOutput::new(rows, vec!["row".to_string()]);
    for (i, count) in errors_per_row.iter().enumerate().take(row_count) {
        for j in 0..*count {
            output.add_row_error(i + 1, ValidationIssue::error(None, format!("e{i}-{j}")));
        }
    }
    output.into_report()
}

fn error_counts(row_count: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..3, row_count..=row_count.max(1))
}

// ============================================================================
// Header Reconciliation Properties
// ============================================================================

proptest! {
    /// With no authority, reconciliation is the identity function.
    #[test]
    fn reconcile_without_authority_is_identity(observed in header_list(8)) {
        prop_assert_eq!(reconcile(&observed, &HeaderAuthority::None), observed);
    }

    /// An explicit authority is returned verbatim, regardless of the data.
    #[test]
    fn reconcile_with_explicit_authority_ignores_observed(
        observed in header_list(8),
        explicit in header_list(8),
    ) {
        let authority = HeaderAuthority::Explicit(explicit.clone());
        prop_assert_eq!(reconcile(&observed, &authority), explicit);
    }

    /// A schema authority permutes the observed headers but never adds or
    /// drops one.
    #[test]
    fn reconcile_with_schema_authority_is_a_permutation(
        observed in header_list(8),
        schema in header_list(8),
    ) {
        let authority = HeaderAuthority::Schema(schema);
        let ordered = reconcile(&observed, &authority);

        let mut expected = observed.clone();
        expected.sort();
        let mut actual = ordered.clone();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }

    /// Reconciliation is idempotent: reapplying the same authority to its
    /// own output changes nothing.
    #[test]
    fn reconcile_is_idempotent(
        observed in header_list(8),
        schema in header_list(8),
    ) {
        let authority = HeaderAuthority::Schema(schema);
        let once = reconcile(&observed, &authority);
        let twice = reconcile(&once, &authority);
        prop_assert_eq!(twice, once);
    }
}

// ============================================================================
// Report Combination Properties
// ============================================================================

proptest! {
    /// The empty report is a two-sided identity for combine.
    #[test]
    fn combine_identity(
        row_count in 1usize..6,
        errors in error_counts(5),
    ) {
        let report = report_with(row_count, &errors);
        prop_assert_eq!(Report::empty().combine(report.clone()), report.clone());
        prop_assert_eq!(report.clone().combine(Report::empty()), report);
    }

    /// Combining reports over the same rows preserves the total number of
    /// errors and recomputes counts consistently.
    #[test]
    fn combine_conserves_errors_and_counts(
        row_count in 1usize..6,
        left_errors in error_counts(5),
        right_errors in error_counts(5),
    ) {
        let left = report_with(row_count, &left_errors);
        let right = report_with(row_count, &right_errors);

        let total_errors: usize = (0..row_count)
            .map(|i| left_errors[i] + right_errors[i])
            .sum();

        let merged = left.combine(right);
        let table = &merged.tables[0];

        let merged_errors: usize = table.rows.iter().map(|r| r.errors.len()).sum();
        prop_assert_eq!(merged_errors, total_errors);
        prop_assert_eq!(table.valid_row_count + table.invalid_row_count, row_count);
        prop_assert_eq!(
            merged.valid,
            total_errors == 0 && table.whole_table_errors.is_empty()
        );
    }

    /// Combination is associative: folding three reports left-to-right and
    /// right-to-left yields identical merged reports, row errors included.
    #[test]
    fn combine_is_associative(
        row_count in 1usize..6,
        first_errors in error_counts(5),
        second_errors in error_counts(5),
        third_errors in error_counts(5),
    ) {
        let left_fold = report_with(row_count, &first_errors)
            .combine(report_with(row_count, &second_errors))
            .combine(report_with(row_count, &third_errors));
        let right_fold = report_with(row_count, &first_errors).combine(
            report_with(row_count, &second_errors)
                .combine(report_with(row_count, &third_errors)),
        );

        prop_assert_eq!(left_fold, right_fold);
    }

    /// Combination order never changes which rows are invalid, only the
    /// order of errors within a row.
    #[test]
    fn combine_validity_is_order_independent(
        row_count in 1usize..6,
        left_errors in error_counts(5),
        right_errors in error_counts(5),
    ) {
        let forward = report_with(row_count, &left_errors)
            .combine(report_with(row_count, &right_errors));
        let reverse = report_with(row_count, &right_errors)
            .combine(report_with(row_count, &left_errors));

        prop_assert_eq!(forward.valid, reverse.valid);
        for (f, r) in forward.tables[0].rows.iter().zip(&reverse.tables[0].rows) {
            prop_assert_eq!(f.errors.len(), r.errors.len());
        }
    }
}

// ============================================================================
// Casting Properties
// ============================================================================

proptest! {
    /// Casting is idempotent: a casted value casts to itself.
    #[test]
    fn casting_is_idempotent(text in ".{0,20}") {
        let once = cast_str(&text);
        prop_assert_eq!(cast_value(&once), once.clone());
    }

    /// Integer-looking strings always cast to that integer.
    #[test]
    fn integers_cast_exactly(n in -1_000_000i64..1_000_000) {
        prop_assert_eq!(cast_str(&n.to_string()), json!(n));
    }

    /// Non-numeric text survives casting as its trimmed self.
    #[test]
    fn non_numeric_text_is_trimmed_passthrough(text in "[a-zA-Z][a-zA-Z ]{0,15}") {
        let casted = cast_str(&text);
        prop_assert_eq!(casted, json!(text.trim()));
    }
}

// ============================================================================
// CSV Normalization Properties
// ============================================================================

proptest! {
    /// Every non-header line of a CSV payload becomes exactly one numbered
    /// row, in order, regardless of how ragged the lines are.
    #[test]
    fn csv_rows_are_numbered_in_source_order(
        cells in prop::collection::vec(
            prop::collection::vec("[a-z0-9]{0,4}", 1..5),
            0..6,
        ),
    ) {
        let mut payload = String::from("a,b,c\n");
        for line in &cells {
            payload.push_str(&line.join(","));
            payload.push('\n');
        }

        let source = normalize(
            payload.as_bytes(),
            CONTENT_TYPE_CSV,
            &HeaderAuthority::None,
            &CsvOptions::default(),
            "StructuralValidator",
        )
        .unwrap();

        prop_assert_eq!(source.rows.len(), cells.len());
        for (i, row) in source.rows.iter().enumerate() {
            prop_assert_eq!(row.number, i + 1);
            // A record never exceeds the canonical width plus surplus cells.
            prop_assert!(row.cells.len() >= source.headers.len() || row.is_blank());
        }
    }
}
