//! The SQL rule back-end: each row becomes a one-row in-memory relation
//! and the rule is evaluated as a single SELECT expression over it.
//!
//! The evaluator owns a private DataFusion `SessionContext`; no persistent
//! data is ever registered on it. Rule text is truncated at the first `;`
//! before composition, so only the first statement of a rule ever runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use serde_json::Value;
use tracing::instrument;

use crate::error::{IngestError, Result};
use crate::sources::Row;
use crate::validators::RuleEvaluator;

/// Evaluates SQL expression rules against single rows.
pub struct SqlRuleEvaluator {
    ctx: SessionContext,
    table_counter: AtomicU64,
}

impl std::fmt::Debug for SqlRuleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlRuleEvaluator").finish_non_exhaustive()
    }
}

impl Default for SqlRuleEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlRuleEvaluator {
    /// Creates an evaluator with a fresh, private session context.
    pub fn new() -> Self {
        Self {
            ctx: SessionContext::new(),
            table_counter: AtomicU64::new(0),
        }
    }

    /// Discards anything after the first statement separator.
    fn first_statement_only(sql: &str) -> &str {
        sql.split(';').next().unwrap_or_default()
    }

    /// Builds the one-row relation for a casted row: integers as `Int64`,
    /// floats as `Float64`, booleans as `Boolean`, everything else as
    /// nullable `Utf8`.
    fn one_row_batch(row: &Row) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(row.len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(row.len());

        for (name, value) in row.iter() {
            let (data_type, array): (DataType, ArrayRef) = match value {
                Value::Number(n) if n.is_i64() => (
                    DataType::Int64,
                    Arc::new(Int64Array::from(vec![n.as_i64()])),
                ),
                Value::Number(n) => (
                    DataType::Float64,
                    Arc::new(Float64Array::from(vec![n.as_f64()])),
                ),
                Value::Bool(b) => (
                    DataType::Boolean,
                    Arc::new(BooleanArray::from(vec![Some(*b)])),
                ),
                Value::Null => (
                    DataType::Utf8,
                    Arc::new(StringArray::from(vec![None::<&str>])),
                ),
                Value::String(s) => (
                    DataType::Utf8,
                    Arc::new(StringArray::from(vec![Some(s.as_str())])),
                ),
                other => (
                    DataType::Utf8,
                    Arc::new(StringArray::from(vec![Some(other.to_string().as_str())])),
                ),
            };
            fields.push(Field::new(name, data_type, true));
            columns.push(array);
        }

        let schema = Arc::new(Schema::new(fields));
        let options = RecordBatchOptions::new().with_row_count(Some(1));
        RecordBatch::try_new_with_options(schema, columns, &options).map_err(IngestError::from)
    }

    /// Interprets the single result cell as a predicate outcome: SQL
    /// boolean, nonzero number, or nonempty string; NULL is false.
    fn truthy_cell(batch: &RecordBatch) -> Result<bool> {
        if batch.num_columns() == 0 || batch.num_rows() == 0 {
            return Ok(false);
        }
        let column = batch.column(0);
        if column.is_null(0) {
            return Ok(false);
        }
        if let Some(values) = column.as_any().downcast_ref::<BooleanArray>() {
            return Ok(values.value(0));
        }
        if let Some(values) = column.as_any().downcast_ref::<Int64Array>() {
            return Ok(values.value(0) != 0);
        }
        if let Some(values) = column.as_any().downcast_ref::<Float64Array>() {
            return Ok(values.value(0) != 0.0);
        }
        if let Some(values) = column.as_any().downcast_ref::<StringArray>() {
            return Ok(!values.value(0).is_empty());
        }
        Err(IngestError::rule_evaluation(format!(
            "unsupported SQL result type: {}",
            column.data_type()
        )))
    }
}

#[async_trait]
impl RuleEvaluator for SqlRuleEvaluator {
    #[instrument(skip(self, code, row))]
    async fn evaluate(&self, code: &Value, row: &Row) -> Result<bool> {
        let rule = code.as_str().ok_or_else(|| {
            IngestError::rule_evaluation("SQL rule code must be a string expression")
        })?;
        let expression = Self::first_statement_only(rule).trim();
        if expression.is_empty() {
            return Ok(true);
        }

        let batch = Self::one_row_batch(row)?;
        let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;

        // Unique per evaluation so one evaluator instance can serve
        // concurrent validations without table-name collisions.
        let table_name = format!(
            "rule_row_{}",
            self.table_counter.fetch_add(1, Ordering::Relaxed)
        );
        self.ctx.register_table(&table_name, Arc::new(table))?;

        let sql = format!("SELECT ({expression}) FROM {table_name}");
        let outcome = async {
            let batches = self.ctx.sql(&sql).await?.collect().await?;
            match batches.first() {
                Some(batch) => Self::truthy_cell(batch),
                None => Ok(false),
            }
        }
        .await;

        // The relation is per-evaluation scratch; always drop it.
        let _ = self.ctx.deregister_table(&table_name);
        outcome
    }
}
