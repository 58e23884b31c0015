//! Subscriber configuration for binaries and tests built on Tether.
//!
//! Library crates only emit `tracing` events; applications decide where they
//! go. [`TracingConfig`] installs a `tracing-subscriber` registry with an
//! [`EnvFilter`] and one formatting layer.
//!
//! # Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `TETHER_LOG` | filter directives, e.g. `tether_context=trace,info` |
//! | `TETHER_LOG_FORMAT` | `pretty`, `compact` or `json` |
//!
//! # Example
//!
//! ```
//! use tether_core::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! let config = TracingConfig::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("tether_diagnostics=trace");
//!
//! config.init();
//! tracing::debug!("subscriber ready");
//! ```

use core::fmt;
use core::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "TETHER_LOG";

/// Environment variable holding the output format.
pub const LOG_FORMAT_ENV: &str = "TETHER_LOG_FORMAT";

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

/// Error returned when a [`TracingFormat`] name is not recognized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown tracing format `{0}`, expected one of: pretty, compact, json")]
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

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level used when no filter is given, or the filter is invalid.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Filter directives (e.g. `tether_context=trace,warn`).
    pub env_filter: Option<String>,
    /// Whether span enter/exit events are printed.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`LOG_ENV`] and [`LOG_FORMAT_ENV`] from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ParseFormatError`] if the format variable is set to an
    /// unknown name.
    pub fn from_env() -> Result<Self, ParseFormatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// ```
    /// use tether_core::{TracingConfig, TracingFormat};
    ///
    /// let config = TracingConfig::from_lookup(|key| match key {
    ///     "TETHER_LOG" => Some("tether_context=trace".to_owned()),
    ///     "TETHER_LOG_FORMAT" => Some("json".to_owned()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.format, TracingFormat::Json);
    /// assert_eq!(config.env_filter.as_deref(), Some("tether_context=trace"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ParseFormatError`] if the format variable is set to an
    /// unknown name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ParseFormatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key| lookup(key).filter(|value: &String| !value.trim().is_empty());

        let mut config = Self::default();
        if let Some(filter) = read(LOG_ENV) {
            config.env_filter = Some(filter);
        }
        if let Some(format) = read(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    /// Sets the fallback log level.
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

    /// Sets filter directives.
    ///
    /// Format: `target=level,target=level,...`
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

    /// Builds the filter, falling back to [`level`](Self::level) when the
    /// directives do not parse.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    /// Installs the global subscriber.
    ///
    /// Returns `false` if a global subscriber was already installed, in
    /// which case nothing changes.
    pub fn init(&self) -> bool {
        let filter = self.filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        };

        if installed {
            tracing::info!(
                level = %self.level,
                format = %self.format,
                filter = ?self.env_filter,
                "tracing subscriber installed"
            );
        }
        installed
    }
}
