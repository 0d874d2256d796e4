//! The row-predicate validator: one rule set evaluated against every row.
//!
//! Evaluation back-ends (JSON-logic, SQL) plug in through [`RuleEvaluator`].
//! Missing-column handling, invert logic, message rendering, and error
//! recovery are shared here.

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::headers::HeaderAuthority;
use crate::message;
use crate::output::{Report, RowData, Severity, ValidationIssue, ValidatorOutput};
use crate::rules::RowRule;
use crate::sources::{normalize, CsvOptions, Row};
use crate::validators::Validator;

/// A back-end that decides whether one rule holds for one row.
///
/// Implementations see the row with cells already run through the shared
/// numeric casting rule. Errors are recovered by the rowwise loop into row
/// errors; they never abort the run.
#[async_trait]
pub trait RuleEvaluator: Debug + Send + Sync {
    /// Evaluates the rule's predicate against the row.
    async fn evaluate(&self, code: &Value, row: &Row) -> Result<bool>;
}

/// Applies an ordered rule list to every row of a normalized source.
#[derive(Debug)]
pub struct RowwiseValidator {
    name: &'static str,
    rules: Vec<RowRule>,
    invert: bool,
    evaluator: Box<dyn RuleEvaluator>,
    authority: HeaderAuthority,
    csv: CsvOptions,
}

impl RowwiseValidator {
    /// Creates the validator from a rule document (an array of rules).
    ///
    /// `invert` flips predicate truth for failure-condition rule sets.
    pub fn new(
        name: &'static str,
        document: &Value,
        invert: bool,
        evaluator: Box<dyn RuleEvaluator>,
        authority: HeaderAuthority,
        csv: CsvOptions,
    ) -> Result<Self> {
        Ok(Self {
            name,
            rules: RowRule::parse_document(document, name)?,
            invert,
            evaluator,
            authority,
            csv,
        })
    }

    fn invert_if_needed(&self, value: bool) -> bool {
        if self.invert {
            !value
        } else {
            value
        }
    }
}

/// `Unable to evaluate, missing columns: {'a', 'b'}`, in rule-declared
/// order.
fn missing_columns_message(missing: &[&String]) -> String {
    let quoted: Vec<String> = missing.iter().map(|c| format!("'{c}'")).collect();
    format!(
        "Unable to evaluate, missing columns: {{{}}}",
        quoted.join(", ")
    )
}

#[async_trait]
impl Validator for RowwiseValidator {
    #[instrument(skip(self, raw), fields(validator = self.name))]
    async fn validate(&self, raw: &[u8], content_type: &str) -> Result<Report> {
        let source = normalize(raw, content_type, &self.authority, &self.csv, self.name)?;

        let rows: Vec<(usize, Row)> = source
            .rows
            .iter()
            .map(|row| (row.number, row.record(&source.headers)))
            .collect();
        let mut output = ValidatorOutput::new(
            rows.iter()
                .map(|(n, r)| (*n, RowData::Tabular(r.clone())))
                .collect(),
            source.headers.clone(),
        );

        for (row_number, record) in &rows {
            let casted = record.casted();
            for rule in &self.rules {
                let missing: Vec<&String> = rule
                    .columns
                    .iter()
                    .filter(|c| !source.headers.contains(*c))
                    .collect();
                if !missing.is_empty() {
                    output.add_row_error(
                        *row_number,
                        ValidationIssue::error(
                            rule.error_code.clone(),
                            missing_columns_message(&missing),
                        ),
                    );
                    continue;
                }

                if rule.is_noop() {
                    continue;
                }

                match self.evaluator.evaluate(&rule.code, &casted).await {
                    Ok(result) => {
                        if !self.invert_if_needed(result) {
                            let severity = rule
                                .severity
                                .as_deref()
                                .map(Severity::parse)
                                .unwrap_or_default();
                            let fields: Vec<String> = record
                                .keys()
                                .filter(|k| rule.columns.contains(*k))
                                .cloned()
                                .collect();
                            output.add_row_error(
                                *row_number,
                                ValidationIssue::new(
                                    severity,
                                    rule.error_code.clone(),
                                    message::render(&rule.message, record),
                                    fields,
                                ),
                            );
                        }
                    }
                    Err(err) => {
                        warn!(
                            validator = self.name,
                            row = row_number,
                            error = %err,
                            "rule evaluation failed; recording as row error"
                        );
                        output.add_row_error(
                            *row_number,
                            ValidationIssue::error(
                                rule.error_code.clone(),
                                format!("{}: {}", err.kind(), err),
                            ),
                        );
                    }
                }
            }
        }

        Ok(output.into_report())
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CONTENT_TYPE_CSV;
    use crate::validators::JsonLogicEvaluator;
    use serde_json::json;

    fn validator(rules: Value, invert: bool) -> RowwiseValidator {
        RowwiseValidator::new(
            "JsonlogicValidator",
            &rules,
            invert,
            Box::new(JsonLogicEvaluator),
            HeaderAuthority::None,
            CsvOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn zero_rules_validate_everything() {
        let v = validator(json!([]), false);
        let raw = b"Name,Title,level\nGuido,BDFL,20\n\nCatherine,,9,DBA\n,\nTony,Engineer,10\n";
        let report = v.validate(raw, CONTENT_TYPE_CSV).await.unwrap();
        let table = &report.tables[0];
        assert_eq!(table.rows.len(), 5);
        assert_eq!(table.valid_row_count, 5);
        assert!(report.valid);
    }

    #[tokio::test]
    async fn blank_csv_is_valid() {
        let v = validator(json!([]), false);
        let report = v.validate(b"", CONTENT_TYPE_CSV).await.unwrap();
        assert!(report.valid);
        assert_eq!(report.tables[0].rows.len(), 0);
    }

    #[tokio::test]
    async fn failing_predicate_emits_a_rendered_row_error() {
        let rules = json!([{
            "columns": ["spent", "budget"],
            "code": {"<=": [{"var": "spent"}, {"var": "budget"}]},
            "message": "spent {spent} exceeds budget {budget}",
            "severity": "Warning",
            "error_code": "overspend"
        }]);
        let v = validator(rules, false);
        let raw = b"category,spent,budget\npens,50,100\npaper,300,200\n";
        let report = v.validate(raw, CONTENT_TYPE_CSV).await.unwrap();
        let table = &report.tables[0];
        assert_eq!(table.valid_row_count, 1);
        assert_eq!(table.invalid_row_count, 1);

        let issue = &table.rows[1].errors[0];
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.code.as_deref(), Some("overspend"));
        assert_eq!(issue.message, "spent 300 exceeds budget 200");
        // Fields follow the row's column order, not the rule's.
        assert_eq!(issue.fields, vec!["spent", "budget"]);
    }

    #[tokio::test]
    async fn invert_logic_flips_failure_conditions() {
        let rules = json!([{
            "columns": ["spent"],
            "code": {">": [{"var": "spent"}, 100]},
            "message": "overspent"
        }]);
        let v = validator(rules.clone(), true);
        let raw = b"spent\n50\n300\n";
        let report = v.validate(raw, CONTENT_TYPE_CSV).await.unwrap();
        let table = &report.tables[0];
        assert!(table.rows[0].errors.is_empty());
        assert_eq!(table.rows[1].errors[0].message, "overspent");
    }

    #[tokio::test]
    async fn missing_columns_skip_evaluation_with_a_row_error() {
        let rules = json!([{
            "columns": ["a", "zz", "yy"],
            "code": {"==": [1, 1]},
            "message": "m"
        }]);
        let v = validator(rules, false);
        let report = v.validate(b"a,b\n1,2\n", CONTENT_TYPE_CSV).await.unwrap();
        let issue = &report.tables[0].rows[0].errors[0];
        assert_eq!(
            issue.message,
            "Unable to evaluate, missing columns: {'zz', 'yy'}"
        );
        assert!(issue.fields.is_empty());
    }

    #[tokio::test]
    async fn evaluator_errors_become_row_errors_and_the_run_continues() {
        let rules = json!([
            {"columns": ["a"], "code": {"frobnicate": [1]}, "message": "m"},
            {"columns": ["a"], "code": {"==": [{"var": "a"}, 1]}, "message": "wrong"}
        ]);
        let v = validator(rules, false);
        let report = v.validate(b"a\n1\n2\n", CONTENT_TYPE_CSV).await.unwrap();
        let table = &report.tables[0];

        // Both rows carry the evaluator failure; only row 2 fails the
        // second rule.
        assert!(table.rows[0].errors[0]
            .message
            .starts_with("RuleEvaluationError: "));
        assert_eq!(table.rows[0].errors.len(), 1);
        assert_eq!(table.rows[1].errors.len(), 2);
        assert_eq!(table.rows[1].errors[1].message, "wrong");
    }

    #[tokio::test]
    async fn null_rule_code_always_passes() {
        let rules = json!([{"columns": ["a"], "code": null, "message": "m"}]);
        let v = validator(rules, false);
        let report = v.validate(b"a\n1\n", CONTENT_TYPE_CSV).await.unwrap();
        assert!(report.valid);
    }
}
