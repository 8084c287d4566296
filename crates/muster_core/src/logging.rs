//! Tracing subscriber setup.
//!
//! [`TracingSetup`] installs a `tracing_subscriber` registry with an
//! [`EnvFilter`] and one fmt layer. Installing twice is a no-op, so tests and
//! embedding applications can call it freely.
//!
//! # Example
//!
//! ```
//! use muster_core::{TracingFormat, TracingSetup};
//! use tracing::Level;
//!
//! let config = TracingSetup::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("muster_registry=debug,muster_graph=info")
//!     .init();
//!
//! assert_eq!(config.level, Level::DEBUG);
//! ```

use core::fmt;
use core::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Error parsing a [`TracingFormat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format '{0}': expected pretty, compact or json")]
pub struct ParseFormatError(String);

impl FromStr for TracingFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ParseFormatError(s.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The configuration a subscriber was installed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSetup
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the process-wide tracing subscriber.
///
/// When both are set, the env filter wins over the level for filtering;
/// an invalid filter falls back to the level.
#[derive(Debug, Clone)]
pub struct TracingSetup {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingSetup {
    /// Creates a setup with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the filter from environment variable `var`, if set and not empty.
    #[must_use]
    pub fn with_env_var(self, var: &str) -> Self {
        match std::env::var(var) {
            Ok(filter) if !filter.trim().is_empty() => self.with_env_filter(filter),
            _ => self,
        }
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a filter directive string, e.g. `muster_registry=debug,warn`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// The configuration this setup installs.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|filter| EnvFilter::try_new(filter).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    /// Installs the subscriber. Does nothing if one is already installed.
    pub fn init(&self) -> TracingConfig {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(self.filter());

        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init(),
        };

        if installed.is_ok() {
            tracing::debug!(level = %self.level, format = %self.format, "tracing initialised");
        }
        self.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_info_and_pretty() {
        let setup = TracingSetup::default();
        assert_eq!(setup.level, Level::INFO);
        assert_eq!(setup.format, TracingFormat::Pretty);
        assert!(setup.env_filter.is_none());
        assert!(!setup.span_events);
    }

    #[test]
    fn builders_set_fields() {
        let setup = TracingSetup::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("muster_graph=trace")
            .with_span_events(true);
        assert_eq!(
            setup.config(),
            TracingConfig {
                level: Level::DEBUG,
                format: TracingFormat::Json,
            }
        );
        assert_eq!(setup.env_filter.as_deref(), Some("muster_graph=trace"));
        assert!(setup.span_events);
    }

    #[test]
    fn unset_env_var_keeps_filter() {
        let setup = TracingSetup::new().with_env_var("MUSTER_TEST_UNSET_FILTER_VARIABLE");
        assert!(setup.env_filter.is_none());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<TracingFormat>().unwrap(), TracingFormat::Json);
        assert_eq!("compact".parse::<TracingFormat>().unwrap(), TracingFormat::Compact);
        assert!("yaml".parse::<TracingFormat>().is_err());
        assert_eq!(TracingFormat::Pretty.to_string(), "pretty");
    }

    #[test]
    fn init_twice_is_harmless() {
        let setup = TracingSetup::new().with_format(TracingFormat::Compact);
        let first = setup.init();
        let second = setup.init();
        assert_eq!(first, second);
    }
}
