//! Scoped diagnostic handlers for Tether (Layer 2).
//!
//! Diagnostics are non-fatal conditions (warnings, notices, deprecations)
//! reported while a call runs. This crate routes them through a per-thread
//! stack of handlers, and provides policies that install a handler for a
//! dynamic extent using the Layer 1 scoped-resource protocol:
//!
//! - [`severity`] - Diagnostic categories and masks
//! - [`diagnostic`] - Diagnostics and the default escalated error
//! - [`runtime`] - Installing handlers and emitting diagnostics
//! - [`policy`] - Silent, callback and exception policies
//! - [`call`] - Running one call under a policy
//!
//! # Example
//!
//! ```
//! use tether_context::executor::run_with;
//! use tether_context::value::Value;
//! use tether_diagnostics::policy::ExceptionPolicy;
//! use tether_diagnostics::runtime;
//! use tether_diagnostics::severity::Severity;
//!
//! let policy = ExceptionPolicy::new().with_severities(Severity::ERRORS);
//!
//! let result = run_with([Value::resource(policy)], |_| {
//!     runtime::trigger(Severity::NOTICE, "ignored by the policy")?;
//!     runtime::trigger(Severity::USER_ERROR, "invalid DN syntax")?;
//!     Ok(())
//! });
//!
//! assert_eq!(result.unwrap_err().to_string(), "invalid DN syntax");
//! assert_eq!(runtime::depth(), 0);
//! ```

/// Diagnostic policies usable as scoped resources.
pub mod policy;

/// Running one call under a policy.
pub mod call;

/// Diagnostics and the default escalated error.
pub mod diagnostic;

/// Error types.
pub mod error;

/// The per-thread handler stack.
pub mod runtime;

/// Diagnostic categories and masks.
pub mod severity;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::call::*;
    pub use crate::diagnostic::*;
    pub use crate::error::*;
    pub use crate::policy::*;
    pub use crate::runtime::{DiagnosticHandler, HandlerId};
    pub use crate::severity::*;
}
