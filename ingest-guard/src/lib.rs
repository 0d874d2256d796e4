//! # Ingest Guard - Upload Validation for Rust
//!
//! Ingest Guard is a row-oriented validation engine for tabular uploads.
//! It normalizes CSV and JSON payloads into row-indexed records, runs a
//! configurable set of validators over them, and merges the results into
//! one canonical report with row and column provenance preserved.
//!
//! ## Overview
//!
//! Callers hand the engine a raw payload, its declared content type, and
//! an ordered set of validator configurations; they get back a [`Report`]
//! listing every row with its errors, whole-table errors, counts, and an
//! overall validity flag. The engine never silently drops rows or errors:
//! a call produces either a well-formed report (possibly invalid) or a
//! typed configuration/content-type error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ingest_guard::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = EngineConfig {
//!     validators: vec![
//!         ValidatorConfig::new(ValidatorKind::Structural, "rules/schema.json"),
//!         ValidatorConfig::new(ValidatorKind::Sql, "rules/budget.yaml"),
//!     ],
//!     ..EngineConfig::default()
//! };
//!
//! let engine = ValidationEngine::from_config(config).await?;
//! let report = engine
//!     .apply(b"category,spent,budget\npens,50,100\n", "text/csv")
//!     .await?;
//!
//! if !report.valid {
//!     for row in &report.tables[0].rows {
//!         for error in &row.errors {
//!             println!("row {}: {}", row.row_number, error.message);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Validator Kinds
//!
//! - **`structural`**: tabular shape checks: blank rows, surplus values,
//!   headers missing from or extra to a declared schema field list.
//! - **`jsonlogic`** / **`jsonlogic-failure-conditions`**: per-row boolean
//!   predicates expressed as JSON-logic documents, evaluated by a bounded
//!   interpreter.
//! - **`sql`** / **`sql-failure-conditions`**: per-row predicates expressed
//!   as single SQL expressions, evaluated over a one-row in-memory
//!   relation on a private DataFusion context.
//! - **`jsonschema`**: whole-document validation against a JSON-Schema.
//!
//! The `-failure-conditions` variants invert predicate truth: their rules
//! describe invalid states rather than valid ones.
//!
//! ## Rule Documents
//!
//! Rules are JSON or YAML documents loaded once at engine construction
//! from a local path or a URL. Row-predicate rules carry the columns they
//! need, the predicate, and a message template with `{column}` and
//! `{A op B[:precision]}` substitution (see [`message`]).
//!
//! ## Headers
//!
//! All validators in one run share a canonical column order, reconciled
//! from the observed headers and either an explicit configured list or a
//! structural schema's declared fields (see [`headers`]).

pub mod cast;
pub mod engine;
pub mod error;
pub mod headers;
pub mod logging;
pub mod message;
pub mod output;
pub mod prelude;
pub mod rules;
pub mod shape;
pub mod sources;
pub mod validators;

pub use engine::{EngineConfig, HeaderSource, ValidationEngine, ValidatorConfig};
pub use error::{IngestError, Result};
pub use output::{Report, RowData, RowEntry, Severity, TableResult, ValidationIssue};
pub use validators::{Validator, ValidatorKind};
