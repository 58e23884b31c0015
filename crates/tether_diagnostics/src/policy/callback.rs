use core::fmt;
use std::sync::Arc;

use tether_context::error::BoxError;

use super::Installation;
use crate::diagnostic::Diagnostic;
use crate::runtime::DiagnosticHandler;
use crate::severity::Severity;

type Callback = dyn Fn(&Diagnostic) -> bool + Send + Sync;

/// Forwards diagnostics to a closure.
///
/// The closure's result is passed through unchanged: `true` claims the
/// diagnostic, `false` lets the next handler outward see it.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use tether_diagnostics::call::call_with_handler;
/// use tether_diagnostics::policy::CallbackPolicy;
/// use tether_diagnostics::runtime;
/// use tether_diagnostics::severity::Severity;
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = seen.clone();
/// let policy = CallbackPolicy::new(move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     true
/// });
///
/// call_with_handler(policy, || runtime::trigger(Severity::NOTICE, "entry has no dn")).unwrap();
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct CallbackPolicy {
    callback: Arc<Callback>,
    severities: Severity,
    installation: Installation,
}

impl CallbackPolicy {
    /// Creates a policy forwarding every category to `callback`.
    #[must_use]
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Diagnostic) -> bool + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
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

    /// Returns the wrapped callback.
    #[must_use]
    pub fn callback(&self) -> &Arc<dyn Fn(&Diagnostic) -> bool + Send + Sync> {
        &self.callback
    }

    /// Returns `true` while this policy is entered.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installation.is_installed()
    }
}

impl DiagnosticHandler for CallbackPolicy {
    fn handle(&self, diagnostic: &Diagnostic) -> Result<bool, BoxError> {
        Ok((self.callback)(diagnostic))
    }
}

impl fmt::Debug for CallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPolicy")
            .field("severities", &self.severities)
            .field("installation", &self.installation)
            .finish_non_exhaustive()
    }
}

impl_policy_scope!(CallbackPolicy);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_callback_result() {
        let claims = CallbackPolicy::new(|d| d.severity() == Severity::USER_NOTICE);

        let notice = Diagnostic::new(Severity::USER_NOTICE, "claimed");
        let warning = Diagnostic::new(Severity::USER_WARNING, "passed on");
        assert!(claims.handle(&notice).unwrap());
        assert!(!claims.handle(&warning).unwrap());
    }

    #[test]
    fn severities_default_to_all() {
        let policy = CallbackPolicy::new(|_| true);
        assert_eq!(policy.severities(), Severity::all());

        let policy = policy.with_severities(Severity::DEPRECATIONS);
        assert_eq!(policy.severities(), Severity::DEPRECATIONS);
    }

    #[test]
    fn clones_share_callback() {
        let policy = CallbackPolicy::new(|_| false);
        let clone = policy.clone();
        assert!(Arc::ptr_eq(policy.callback(), clone.callback()));
    }
}
