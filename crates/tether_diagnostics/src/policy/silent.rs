use tether_context::error::BoxError;

use super::Installation;
use crate::diagnostic::Diagnostic;
use crate::runtime::DiagnosticHandler;
use crate::severity::Severity;

/// Claims every diagnostic and does nothing with it.
///
/// While entered, no diagnostic reaches an outer handler or the default log.
///
/// ```
/// use tether_context::scope::ScopedResource;
/// use tether_diagnostics::policy::SilentPolicy;
/// use tether_diagnostics::runtime;
/// use tether_diagnostics::severity::Severity;
///
/// let mut silent = SilentPolicy::new();
/// silent.enter().unwrap();
/// runtime::trigger(Severity::WARNING, "ldap_bind(): Unable to bind to server").unwrap();
/// silent.exit(None).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct SilentPolicy {
    installation: Installation,
}

impl SilentPolicy {
    /// Creates a silent policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mask the policy installs with: every category.
    #[must_use]
    pub fn severities(&self) -> Severity {
        Severity::all()
    }

    /// Returns `true` while this policy is entered.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installation.is_installed()
    }
}

impl DiagnosticHandler for SilentPolicy {
    fn handle(&self, _diagnostic: &Diagnostic) -> Result<bool, BoxError> {
        Ok(true)
    }
}

impl_policy_scope!(SilentPolicy);
