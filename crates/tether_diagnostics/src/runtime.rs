//! The per-thread diagnostic handler stack.
//!
//! Handlers are installed with a severity mask and consulted newest first
//! when a diagnostic is [emitted](emit). A handler returning `Ok(true)`
//! claims the diagnostic; `Ok(false)` passes it on to the next handler
//! outward; `Err` is returned to the emitter. Diagnostics nobody claims are
//! logged through `tracing` at the level given by
//! [`Severity::level`](crate::severity::Severity::level).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tether_diagnostics::runtime::{self, DiagnosticHandler};
//! use tether_diagnostics::diagnostic::Diagnostic;
//! use tether_diagnostics::severity::Severity;
//! use tether_context::error::BoxError;
//!
//! struct Reject;
//!
//! impl DiagnosticHandler for Reject {
//!     fn handle(&self, diagnostic: &Diagnostic) -> Result<bool, BoxError> {
//!         Err(diagnostic.message().to_owned().into())
//!     }
//! }
//!
//! let id = runtime::install(Arc::new(Reject), Severity::WARNING);
//!
//! assert!(runtime::trigger(Severity::WARNING, "size limit exceeded").is_err());
//! assert!(runtime::trigger(Severity::NOTICE, "not ours").is_ok());
//!
//! assert!(runtime::uninstall(id));
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tether_context::error::BoxError;

use crate::diagnostic::{Diagnostic, Location};
use crate::severity::Severity;

/// Receives diagnostics emitted while it is installed.
pub trait DiagnosticHandler: Send + Sync + 'static {
    /// Handles `diagnostic`.
    ///
    /// Returns `Ok(true)` to claim the diagnostic and `Ok(false)` to pass it
    /// on to the next handler outward.
    ///
    /// # Errors
    ///
    /// An error escalates the diagnostic; it is returned to the emitter.
    fn handle(&self, diagnostic: &Diagnostic) -> Result<bool, BoxError>;
}

/// Identifies an installed handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
struct Installed {
    id: HandlerId,
    severities: Severity,
    handler: Arc<dyn DiagnosticHandler>,
}

thread_local! {
    static HANDLERS: RefCell<Vec<Installed>> = const { RefCell::new(Vec::new()) };
}

/// Installs `handler` for diagnostics intersecting `severities`.
///
/// The handler becomes the innermost one on the current thread.
pub fn install(handler: Arc<dyn DiagnosticHandler>, severities: Severity) -> HandlerId {
    let id = HandlerId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    HANDLERS.with_borrow_mut(|handlers| {
        handlers.push(Installed {
            id,
            severities,
            handler,
        });
    });
    tracing::trace!(id = id.0, %severities, "diagnostic handler installed");
    id
}

/// Removes the handler identified by `id`.
///
/// Returns `false` if it is not installed on the current thread. Removing a
/// handler that is not the innermost one is allowed but logged.
pub fn uninstall(id: HandlerId) -> bool {
    HANDLERS.with_borrow_mut(|handlers| {
        let Some(position) = handlers.iter().position(|installed| installed.id == id) else {
            return false;
        };
        if position + 1 != handlers.len() {
            tracing::warn!(
                id = id.0,
                depth = handlers.len(),
                position,
                "diagnostic handler uninstalled out of order"
            );
        }
        handlers.remove(position);
        tracing::trace!(id = id.0, "diagnostic handler uninstalled");
        true
    })
}

/// Returns `true` if `id` is installed on the current thread.
#[must_use]
pub fn is_installed(id: HandlerId) -> bool {
    HANDLERS.with_borrow(|handlers| handlers.iter().any(|installed| installed.id == id))
}

/// Returns the number of handlers installed on the current thread.
#[must_use]
pub fn depth() -> usize {
    HANDLERS.with_borrow(Vec::len)
}

/// Removes every handler installed on the current thread.
pub fn reset() {
    HANDLERS.with_borrow_mut(Vec::clear);
}

/// Delivers `diagnostic` to the installed handlers, newest first.
///
/// Handlers run against a snapshot, so they may install or uninstall
/// handlers themselves.
///
/// # Errors
///
/// Returns the error raised by the first handler that escalates.
pub fn emit(diagnostic: &Diagnostic) -> Result<(), BoxError> {
    let handlers = HANDLERS.with_borrow(Clone::clone);

    for installed in handlers.iter().rev() {
        if !installed.severities.intersects(diagnostic.severity()) {
            continue;
        }
        if installed.handler.handle(diagnostic)? {
            tracing::trace!(id = installed.id.0, "diagnostic claimed");
            return Ok(());
        }
    }

    log_unclaimed(diagnostic);
    Ok(())
}

/// Emits a diagnostic located at the caller.
///
/// # Errors
///
/// See [`emit`].
#[track_caller]
pub fn trigger(severity: Severity, message: impl Into<String>) -> Result<(), BoxError> {
    let location = Location::caller();
    emit(&Diagnostic::new(severity, message).with_location(location))
}

fn log_unclaimed(diagnostic: &Diagnostic) {
    let severity = diagnostic.severity();
    let location = diagnostic.location().map(ToString::to_string);
    let message = diagnostic.message();

    match severity.level() {
        tracing::Level::ERROR => tracing::error!(%severity, location = ?location, "{message}"),
        tracing::Level::WARN => tracing::warn!(%severity, location = ?location, "{message}"),
        tracing::Level::INFO => tracing::info!(%severity, location = ?location, "{message}"),
        _ => tracing::debug!(%severity, location = ?location, "{message}"),
    }
}
