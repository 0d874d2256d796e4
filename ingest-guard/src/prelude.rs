//! Prelude for commonly used types in ingest-guard.

pub use crate::engine::{EngineConfig, HeaderSource, ValidationEngine, ValidatorConfig};
pub use crate::error::{IngestError, Result};
pub use crate::headers::HeaderAuthority;
pub use crate::logging::LogConfig;
pub use crate::output::{Report, Severity, TableResult, ValidationIssue};
pub use crate::rules::RuleSource;
pub use crate::sources::{CsvOptions, Row};
pub use crate::validators::{Validator, ValidatorKind};
