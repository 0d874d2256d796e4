//! The orchestrator: configuration, validator construction, and the
//! apply-and-combine loop.
//!
//! Configuration is an explicit owned struct passed in by the caller; the
//! engine holds no ambient or global state. Rule documents are resolved
//! once here and cached inside the constructed validators.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::{IngestError, Result};
use crate::headers::HeaderAuthority;
use crate::output::Report;
use crate::rules::{schema_field_names, RuleSource};
use crate::sources::CsvOptions;
use crate::validators::{self, Validator, ValidatorKind};

/// Where the canonical header list comes from, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderSource {
    /// Infer headers from the data (and any structural schema's field
    /// list).
    #[default]
    Inferred,
    /// An explicit ordered header list. Only row-predicate validators
    /// accept this; configuring it alongside any other kind fails fast.
    Explicit(Vec<String>),
}

/// One configured validator: its kind plus where its rules live.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Which validator to build.
    pub kind: ValidatorKind,
    /// The rule document location.
    pub rules: RuleSource,
}

impl ValidatorConfig {
    /// Creates a configuration from a kind and a rule location (local path
    /// or `scheme://` URL).
    pub fn new(kind: ValidatorKind, location: &str) -> Self {
        Self {
            kind,
            rules: RuleSource::from_location(location),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Validators to apply, in order. Order affects only error-list
    /// ordering within a row, never correctness.
    pub validators: Vec<ValidatorConfig>,
    /// Header configuration.
    pub headers: HeaderSource,
    /// CSV stream-parsing options.
    pub csv: CsvOptions,
    /// Timeout for fetching rule documents from URLs.
    pub fetch_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validators: Vec::new(),
            headers: HeaderSource::Inferred,
            csv: CsvOptions::default(),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Runs a configured, ordered set of validators over uploaded payloads.
#[derive(Debug)]
pub struct ValidationEngine {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationEngine {
    /// Builds the engine: resolves every rule document once, derives the
    /// run's header authority, and constructs the validators in configured
    /// order. Configuration problems (unreadable rule documents, header
    /// overrides on incompatible validator kinds, invalid schemas) fail
    /// here, not at validation time.
    pub async fn from_config(config: EngineConfig) -> Result<Self> {
        let mut documents = Vec::with_capacity(config.validators.len());
        for validator in &config.validators {
            documents.push(
                validator
                    .rules
                    .resolve(validator.kind.validator_name(), config.fetch_timeout)
                    .await?,
            );
        }

        let authority = match &config.headers {
            HeaderSource::Explicit(list) => {
                if let Some(incompatible) = config
                    .validators
                    .iter()
                    .find(|v| !v.kind.supports_header_override())
                {
                    return Err(IngestError::configuration(format!(
                        "an explicit header list is not supported by {}",
                        incompatible.kind.validator_name()
                    )));
                }
                HeaderAuthority::Explicit(list.clone())
            }
            HeaderSource::Inferred => config
                .validators
                .iter()
                .zip(&documents)
                .find(|(v, _)| v.kind == ValidatorKind::Structural)
                .map(|(_, document)| schema_field_names(document))
                .filter(|fields| !fields.is_empty())
                .map(HeaderAuthority::Schema)
                .unwrap_or(HeaderAuthority::None),
        };

        let mut built = Vec::with_capacity(config.validators.len());
        for (validator, document) in config.validators.iter().zip(documents) {
            built.push(validators::build(
                validator.kind,
                document,
                authority.clone(),
                config.csv,
            )?);
        }

        Ok(Self { validators: built })
    }

    /// Applies every configured validator to the payload and folds their
    /// reports together, starting from the empty report.
    #[instrument(skip(self, raw), fields(validators = self.validators.len()))]
    pub async fn apply(&self, raw: &[u8], content_type: &str) -> Result<Report> {
        let mut report = Report::empty();
        for validator in &self.validators {
            debug!(validator = validator.name(), "applying validator");
            let result = validator.validate(raw, content_type).await?;
            report = report.combine(result);
        }
        Ok(report)
    }
}
