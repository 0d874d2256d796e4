//! Rule documents: where they come from and how they are loaded.
//!
//! A validator's rules live in a JSON or YAML document, read from a local
//! file or fetched once over HTTP at engine construction. Documents are
//! cached for the validator's lifetime and never reloaded.

use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{IngestError, Result};

/// Matches `scheme://` prefixes that mark a rule location as remote.
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w{3,5}://").expect("valid URL pattern"));

/// Where a rule document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// A local file path.
    Path(PathBuf),
    /// An HTTP(S) URL, fetched once at construction.
    Url(String),
}

impl RuleSource {
    /// Classifies a configured location: anything with a `scheme://`
    /// prefix is remote, everything else is a local path.
    pub fn from_location(location: &str) -> Self {
        if URL_PATTERN.is_match(location) {
            RuleSource::Url(location.to_string())
        } else {
            RuleSource::Path(PathBuf::from(location))
        }
    }

    fn location(&self) -> String {
        match self {
            RuleSource::Path(path) => path.display().to_string(),
            RuleSource::Url(url) => url.clone(),
        }
    }

    fn is_yaml(&self) -> bool {
        let location = self.location();
        location.ends_with(".yml") || location.ends_with(".yaml")
    }

    /// Loads the document, parsing YAML or JSON by file extension.
    ///
    /// URL fetches apply `timeout` and surface failures as configuration
    /// errors naming the validator, the location, and the HTTP status; they
    /// are never retried.
    pub async fn resolve(&self, validator: &str, timeout: Duration) -> Result<Value> {
        let text = match self {
            RuleSource::Path(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                IngestError::configuration(format!(
                    "validator {validator} could not read {}: {e}",
                    path.display()
                ))
            })?,
            RuleSource::Url(url) => {
                let client = reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| {
                        IngestError::configuration(format!("failed to build HTTP client: {e}"))
                    })?;
                let response = client.get(url).send().await.map_err(|e| {
                    IngestError::configuration(format!(
                        "validator {validator} {url} failed: {e}"
                    ))
                })?;
                if !response.status().is_success() {
                    return Err(IngestError::configuration(format!(
                        "validator {validator} {url} returned {}",
                        response.status()
                    )));
                }
                response.text().await.map_err(|e| {
                    IngestError::configuration(format!(
                        "validator {validator} {url} failed: {e}"
                    ))
                })?
            }
        };

        let document: Value = if self.is_yaml() {
            serde_yaml::from_str(&text).map_err(|e| {
                IngestError::configuration(format!(
                    "validator {validator} has an invalid YAML rule document: {e}"
                ))
            })?
        } else {
            serde_json::from_str(&text).map_err(|e| {
                IngestError::configuration(format!(
                    "validator {validator} has an invalid JSON rule document: {e}"
                ))
            })?
        };

        info!(validator, location = %self.location(), "loaded rule document");
        Ok(document)
    }
}

/// One row-predicate rule from a rule document.
#[derive(Debug, Clone, Deserialize)]
pub struct RowRule {
    /// Columns the rule needs; rows missing any of them get a row error
    /// instead of an evaluation.
    pub columns: Vec<String>,
    /// The predicate: a JSON-logic document or a SQL expression string.
    /// Empty or null means the rule always passes.
    #[serde(default)]
    pub code: Value,
    /// Message template, rendered through the expression evaluator.
    #[serde(default)]
    pub message: String,
    /// Severity label; defaults to `Error`.
    #[serde(default)]
    pub severity: Option<String>,
    /// Machine-readable code copied onto emitted issues.
    #[serde(default)]
    pub error_code: Option<String>,
}

impl RowRule {
    /// Parses a rule document (an array of rules).
    pub fn parse_document(document: &Value, validator: &str) -> Result<Vec<RowRule>> {
        serde_json::from_value(document.clone()).map_err(|e| {
            IngestError::configuration(format!(
                "validator {validator} has an invalid rule document: {e}"
            ))
        })
    }

    /// True when the rule has no predicate to evaluate.
    pub fn is_noop(&self) -> bool {
        match &self.code {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Extracts the declared field names from a structural schema document
/// (`fields: [{name, ..}]`). Missing or malformed field lists yield an
/// empty result rather than an error.
pub fn schema_field_names(document: &Value) -> Vec<String> {
    document
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
