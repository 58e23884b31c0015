use core::fmt;
use std::sync::Arc;

use tether_context::error::BoxError;

use super::Installation;
use crate::diagnostic::{Diagnostic, DiagnosticError};
use crate::runtime::DiagnosticHandler;
use crate::severity::Severity;

type Factory = dyn Fn(&Diagnostic) -> BoxError + Send + Sync;

/// Escalates diagnostics into errors.
///
/// Diagnostics whose severity lies outside the policy's mask are declined
/// and continue to outer handlers. Diagnostics inside the mask are turned
/// into an error by the policy's factory and returned to the emitter, where
/// they propagate like any other error.
///
/// # Factories
///
/// | Constructor | Raised error |
/// |-------------|--------------|
/// | [`new`](Self::new) | [`DiagnosticError`] |
/// | [`for_error::<E>`](Self::for_error) | `E::from(diagnostic)` |
/// | [`with_factory`](Self::with_factory) | whatever the closure returns |
///
/// # Example
///
/// ```
/// use tether_context::executor::run_scoped;
/// use tether_diagnostics::diagnostic::DiagnosticError;
/// use tether_diagnostics::policy::ExceptionPolicy;
/// use tether_diagnostics::runtime;
/// use tether_diagnostics::severity::Severity;
///
/// let policy = ExceptionPolicy::new().with_severities(Severity::WARNING);
///
/// let err = run_scoped((policy,), |_| {
///     runtime::trigger(Severity::WARNING, "ldap_search(): Search: No such object")?;
///     Ok(())
/// })
/// .unwrap_err();
///
/// let err = err.downcast_ref::<DiagnosticError>().unwrap();
/// assert_eq!(err.severity(), Severity::WARNING);
/// ```
#[derive(Clone)]
pub struct ExceptionPolicy {
    factory: Arc<Factory>,
    severities: Severity,
    installation: Installation,
}

impl ExceptionPolicy {
    /// Creates a policy raising [`DiagnosticError`] for every category.
    #[must_use]
    pub fn new() -> Self {
        Self::for_error::<DiagnosticError>()
    }

    /// Creates a policy raising `E::from(diagnostic)`.
    ///
    /// ```
    /// use tether_diagnostics::diagnostic::Diagnostic;
    /// use tether_diagnostics::policy::ExceptionPolicy;
    /// use tether_diagnostics::severity::Severity;
    ///
    /// #[derive(Debug, thiserror::Error)]
    /// #[error("ldap error: {0}")]
    /// struct LdapError(String);
    ///
    /// impl From<Diagnostic> for LdapError {
    ///     fn from(diagnostic: Diagnostic) -> Self {
    ///         Self(diagnostic.message().to_owned())
    ///     }
    /// }
    ///
    /// let policy = ExceptionPolicy::for_error::<LdapError>();
    /// let error = policy.exception(&Diagnostic::new(Severity::WARNING, "timeout"));
    /// assert_eq!(error.to_string(), "ldap error: timeout");
    /// ```
    #[must_use]
    pub fn for_error<E>() -> Self
    where
        E: From<Diagnostic> + core::error::Error + Send + Sync + 'static,
    {
        Self::with_factory(|diagnostic| Box::new(E::from(diagnostic.clone())) as BoxError)
    }

    /// Creates a policy raising the error built by `factory`.
    #[must_use]
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&Diagnostic) -> BoxError + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            severities: Severity::all(),
            installation: Installation::default(),
        }
    }

    /// Restricts the policy to `severities`.
    #[must_use]
    pub fn with_severities(mut self, severities: Severity) -> Self {
        self.severities = severities;
        self
    }

    /// Returns the mask the policy installs with.
    #[must_use]
    pub fn severities(&self) -> Severity {
        self.severities
    }

    /// Builds the error for `diagnostic` without raising it.
    #[must_use]
    pub fn exception(&self, diagnostic: &Diagnostic) -> BoxError {
        (self.factory)(diagnostic)
    }

    /// Returns `true` while this policy is entered.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installation.is_installed()
    }
}

impl Default for ExceptionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticHandler for ExceptionPolicy {
    fn handle(&self, diagnostic: &Diagnostic) -> Result<bool, BoxError> {
        if !self.severities.intersects(diagnostic.severity()) {
            return Ok(false);
        }
        Err(self.exception(diagnostic))
    }
}

impl fmt::Debug for ExceptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionPolicy")
            .field("severities", &self.severities)
            .field("installation", &self.installation)
            .finish_non_exhaustive()
    }
}

impl_policy_scope!(ExceptionPolicy);
