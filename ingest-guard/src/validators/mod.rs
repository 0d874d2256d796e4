//! Validator strategies.
//!
//! All validator kinds share one contract: take a raw payload plus its
//! declared content type, and produce a single-table [`Report`]. The closed
//! set of kinds is constructed through a string-keyed registry so callers
//! configure validators by identifier.

use std::fmt::Debug;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{IngestError, Result};
use crate::headers::HeaderAuthority;
use crate::output::Report;
use crate::sources::CsvOptions;

mod jsonlogic;
mod rowwise;
mod schema;
mod sql;
mod structural;

pub use jsonlogic::JsonLogicEvaluator;
pub use rowwise::{RowwiseValidator, RuleEvaluator};
pub use schema::SchemaValidator;
pub use sql::SqlRuleEvaluator;
pub use structural::StructuralValidator;

/// The common validation contract.
#[async_trait]
pub trait Validator: Debug + Send + Sync {
    /// Validates a raw payload, producing a single-table report, or fails
    /// with a typed error for unsupported content types and unparseable
    /// payloads.
    async fn validate(&self, raw: &[u8], content_type: &str) -> Result<Report>;

    /// The validator's name as it appears in error messages.
    fn name(&self) -> &str;
}

/// The closed set of validator kinds, keyed by configuration identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorKind {
    /// Structural shape checks (blank rows, ragged rows, header mismatches).
    Structural,
    /// Row predicates via the bounded JSON-logic interpreter.
    JsonLogic,
    /// JSON-logic predicates phrased as failure conditions.
    JsonLogicFailureConditions,
    /// Row predicates via sandboxed single-statement SQL.
    Sql,
    /// SQL predicates phrased as failure conditions.
    SqlFailureConditions,
    /// JSON-Schema validation of document-shaped payloads.
    JsonSchema,
}

impl ValidatorKind {
    /// The configuration identifier for this kind.
    pub fn id(&self) -> &'static str {
        match self {
            ValidatorKind::Structural => "structural",
            ValidatorKind::JsonLogic => "jsonlogic",
            ValidatorKind::JsonLogicFailureConditions => "jsonlogic-failure-conditions",
            ValidatorKind::Sql => "sql",
            ValidatorKind::SqlFailureConditions => "sql-failure-conditions",
            ValidatorKind::JsonSchema => "jsonschema",
        }
    }

    /// The validator name used in error messages.
    pub fn validator_name(&self) -> &'static str {
        match self {
            ValidatorKind::Structural => "StructuralValidator",
            ValidatorKind::JsonLogic => "JsonlogicValidator",
            ValidatorKind::JsonLogicFailureConditions => "JsonlogicValidatorFailureConditions",
            ValidatorKind::Sql => "SqlValidator",
            ValidatorKind::SqlFailureConditions => "SqlValidatorFailureConditions",
            ValidatorKind::JsonSchema => "JsonschemaValidator",
        }
    }

    /// Whether this kind accepts an explicit header-override list. Only
    /// row-predicate kinds do; the structural and JSON-schema validators
    /// reject the configuration at engine construction.
    pub fn supports_header_override(&self) -> bool {
        matches!(
            self,
            ValidatorKind::JsonLogic
                | ValidatorKind::JsonLogicFailureConditions
                | ValidatorKind::Sql
                | ValidatorKind::SqlFailureConditions
        )
    }

    /// Rules phrased as failure conditions flip predicate truth.
    fn invert_logic(&self) -> bool {
        matches!(
            self,
            ValidatorKind::JsonLogicFailureConditions | ValidatorKind::SqlFailureConditions
        )
    }
}

impl FromStr for ValidatorKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "structural" => Ok(ValidatorKind::Structural),
            "jsonlogic" => Ok(ValidatorKind::JsonLogic),
            "jsonlogic-failure-conditions" => Ok(ValidatorKind::JsonLogicFailureConditions),
            "sql" => Ok(ValidatorKind::Sql),
            "sql-failure-conditions" => Ok(ValidatorKind::SqlFailureConditions),
            "jsonschema" => Ok(ValidatorKind::JsonSchema),
            other => Err(IngestError::configuration(format!(
                "unknown validator kind: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Builds a validator of the given kind from its resolved rule document.
pub fn build(
    kind: ValidatorKind,
    document: Value,
    authority: HeaderAuthority,
    csv: CsvOptions,
) -> Result<Box<dyn Validator>> {
    match kind {
        ValidatorKind::Structural => Ok(Box::new(StructuralValidator::new(
            &document, authority, csv,
        )?)),
        ValidatorKind::JsonLogic | ValidatorKind::JsonLogicFailureConditions => {
            Ok(Box::new(RowwiseValidator::new(
                kind.validator_name(),
                &document,
                kind.invert_logic(),
                Box::new(JsonLogicEvaluator),
                authority,
                csv,
            )?))
        }
        ValidatorKind::Sql | ValidatorKind::SqlFailureConditions => {
            Ok(Box::new(RowwiseValidator::new(
                kind.validator_name(),
                &document,
                kind.invert_logic(),
                Box::new(SqlRuleEvaluator::new()),
                authority,
                csv,
            )?))
        }
        ValidatorKind::JsonSchema => Ok(Box::new(SchemaValidator::new(&document)?)),
    }
}
