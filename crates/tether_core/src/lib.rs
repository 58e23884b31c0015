//! Ambient setup shared by applications built on Tether.
//!
//! The layer crates only emit [`tracing`] events. This crate owns the
//! subscriber side: [`TracingConfig`] picks a level, filter and output
//! format and installs them once per process.
//!
//! ```
//! use tether_core::TracingConfig;
//!
//! let config = TracingConfig::from_env().unwrap_or_default();
//! config.init();
//! ```

/// Subscriber configuration.
pub mod tracing_config;

pub use tracing_config::{
    LOG_ENV, LOG_FORMAT_ENV, ParseFormatError, TracingConfig, TracingFormat,
};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::tracing_config::{ParseFormatError, TracingConfig, TracingFormat};
}
