//! Logging configuration for the validation engine.
//!
//! The engine emits structured events through `tracing`: rule-document
//! loads at `INFO`, per-validator application at `DEBUG`, and recovered
//! rule-evaluation failures at `WARN`. Embedding applications usually
//! install their own subscriber; [`init`] is an opt-in default for
//! binaries and examples.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for engine components.
    pub base_level: Level,
    /// Emit JSON-formatted events instead of human-readable ones.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            json: false,
        }
    }
}

impl LogConfig {
    /// A verbose configuration suitable for debugging rule sets.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            json: false,
        }
    }

    /// A minimal configuration for production: warnings and JSON output.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            json: true,
        }
    }
}

/// Installs a global subscriber honoring `RUST_LOG` when set, falling back
/// to the configured base level. Does nothing if a subscriber is already
/// installed.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ingest_guard={}", config.base_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // A pre-installed subscriber wins.
    let _ = result;
}
