//! Running a single call under a diagnostic policy.
//!
//! These helpers wrap the common case of installing one policy around one
//! call. The previous handler is restored however the call ends.
//!
//! ```
//! use tether_diagnostics::call::{call_raising, call_silently};
//! use tether_diagnostics::runtime;
//! use tether_diagnostics::severity::Severity;
//!
//! let quiet = call_silently(|| {
//!     runtime::trigger(Severity::WARNING, "ldap_unbind(): already closed")?;
//!     Ok("done")
//! });
//! assert_eq!(quiet.unwrap(), "done");
//!
//! let loud = call_raising(|| {
//!     runtime::trigger(Severity::WARNING, "ldap_unbind(): already closed")
//! });
//! assert!(loud.is_err());
//! ```

use tether_context::error::{BoxError, ContextError};
use tether_context::executor::run_scoped;
use tether_context::scope::ScopedResource;

use crate::policy::{ExceptionPolicy, SilentPolicy};

/// Runs `func` with `policy` entered.
///
/// # Errors
///
/// Returns the error from entering the policy or from `func`. If `policy`
/// suppresses an error on exit, returns [`ContextError::Suppressed`].
pub fn call_with_handler<P, T, F>(policy: P, func: F) -> Result<T, BoxError>
where
    P: ScopedResource,
    F: FnOnce() -> Result<T, BoxError>,
{
    run_scoped((policy,), |_| func())?.ok_or_else(|| ContextError::Suppressed.into())
}

/// Runs `func` with a [`SilentPolicy`] entered, discarding every diagnostic.
///
/// # Errors
///
/// Returns the error from `func`.
pub fn call_silently<T, F>(func: F) -> Result<T, BoxError>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    call_with_handler(SilentPolicy::new(), func)
}

/// Runs `func` with a default [`ExceptionPolicy`] entered, so every
/// diagnostic becomes a [`DiagnosticError`](crate::diagnostic::DiagnosticError).
///
/// # Errors
///
/// Returns the error from `func`, including escalated diagnostics.
pub fn call_raising<T, F>(func: F) -> Result<T, BoxError>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    call_with_handler(ExceptionPolicy::new(), func)
}
