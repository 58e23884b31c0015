//! Diagnostics and the default error they escalate to.

use core::fmt;

use thiserror::Error;

use crate::severity::Severity;

/// Source position a diagnostic was raised from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Source file.
    pub file: String,
    /// Line within `file`.
    pub line: u32,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Returns the location of the caller.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let caller = core::panic::Location::caller();
        Self::new(caller.file(), caller.line())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A non-fatal condition reported by the environment or by user code.
///
/// ```
/// use tether_diagnostics::diagnostic::{Diagnostic, Location};
/// use tether_diagnostics::severity::Severity;
///
/// let message = "ldap_search(): Partial search results returned";
/// let diagnostic = Diagnostic::new(Severity::WARNING, message)
///     .with_location(Location::new("search.rs", 12));
///
/// assert_eq!(
///     diagnostic.to_string(),
///     "WARNING: ldap_search(): Partial search results returned at search.rs:12"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    location: Option<Location>,
}

impl Diagnostic {
    /// Creates a diagnostic without a location.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns the severity category.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source location, if known.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

/// The error an [`ExceptionPolicy`](crate::policy::ExceptionPolicy) raises
/// by default.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", .diagnostic.message)]
pub struct DiagnosticError {
    diagnostic: Diagnostic,
}

impl DiagnosticError {
    /// Returns the escalated diagnostic.
    #[must_use]
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }

    /// Returns the severity of the escalated diagnostic.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.diagnostic.severity
    }

    /// Unwraps the escalated diagnostic.
    #[must_use]
    pub fn into_diagnostic(self) -> Diagnostic {
        self.diagnostic
    }
}

impl From<Diagnostic> for DiagnosticError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self { diagnostic }
    }
}
