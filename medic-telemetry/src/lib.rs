//! Logging setup shared by the medic binaries and tests.
//!
//! `RUST_LOG` takes precedence over the configured default filter:
//! ```bash
//! RUST_LOG=medic_rag=debug medic-rag ingest manuel.txt
//! ```

mod capture;

pub use capture::{CapturedEvent, EventCapture, EventCaptureLayer};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when neither `RUST_LOG` nor the caller gives one.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),

    #[error("unknown log format '{0}', expected one of: pretty, compact, json")]
    UnknownFormat(String),
}

/// Output shape of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Directive string such as `"warn,medic_rag=debug"`.
    pub filter: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: LogFormat::default(), filter: DEFAULT_FILTER.to_string(), with_target: true }
    }
}

impl LoggingConfig {
    pub fn new(format: LogFormat) -> Self {
        Self { format, ..Self::default() }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// `RUST_LOG` if set and non-empty, otherwise the configured filter.
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        let directives = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.filter.clone());
        EnvFilter::try_new(&directives).map_err(|e| TelemetryError::InvalidFilter {
            filter: directives.clone(),
            message: e.to_string(),
        })
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(self.with_target);
        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Json => layer.json().boxed(),
        }
    }
}

/// Install the global subscriber.
///
/// Fails if another subscriber is already installed, leaving that one in place.
pub fn try_init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    tracing_subscriber::registry()
        .with(config.fmt_layer().with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}

/// Install the global subscriber, ignoring a second call.
pub fn init(format: LogFormat) {
    if let Err(e) = try_init(&LoggingConfig::new(format)) {
        tracing::debug!(error = %e, "logging already initialized");
    }
}
