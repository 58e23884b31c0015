//! Error types for policy installation.

use thiserror::Error;

/// Errors produced while managing diagnostic policies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiagnosticsError {
    /// The policy is already installed and must be exited before re-entering.
    #[error("policy already installed: {0}")]
    AlreadyInstalled(&'static str),
}
