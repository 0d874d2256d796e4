//! Error types for the ingest-guard validation engine.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IngestError>;

/// All errors produced by the validation engine.
///
/// Configuration problems are fatal and surface at engine construction.
/// Content-type and source-parse problems are per-request and typed so
/// callers can report them. Rule-evaluation problems never escape a
/// validation run: the rowwise loop folds them into row-level errors.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Invalid or missing configuration, detected at validator construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The declared content type cannot be handled by the named validator.
    #[error("Content type {content_type} is not supported by {validator}")]
    UnsupportedContentType {
        /// The content type received from the caller.
        content_type: String,
        /// The validator that rejected it.
        validator: String,
    },

    /// The payload could not be decoded or parsed as the declared content type.
    #[error("failed to parse {content_type} source: {message}")]
    SourceParse {
        /// The content type the payload was declared as.
        content_type: String,
        /// Parser detail.
        message: String,
    },

    /// A single rule failed to evaluate against a single row.
    #[error("{message}")]
    RuleEvaluation {
        /// Evaluator detail.
        message: String,
    },

    /// DataFusion query error from the SQL rule back-end.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Arrow error while building the one-row relation.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl IngestError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        IngestError::Configuration(message.into())
    }

    /// Creates a rule-evaluation error.
    pub fn rule_evaluation(message: impl Into<String>) -> Self {
        IngestError::RuleEvaluation {
            message: message.into(),
        }
    }

    /// Stable label for the error variant, used when folding evaluation
    /// failures into row errors (`"{kind}: {detail}"`).
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Configuration(_) => "ConfigurationError",
            IngestError::UnsupportedContentType { .. } => "UnsupportedContentTypeError",
            IngestError::SourceParse { .. } => "SourceParseError",
            IngestError::RuleEvaluation { .. } => "RuleEvaluationError",
            IngestError::DataFusion(_) => "DataFusionError",
            IngestError::Arrow(_) => "ArrowError",
        }
    }
}
