//! Diagnostic policies that install themselves for a scope.
//!
//! Each policy is a [`DiagnosticHandler`] and a [`ScopedResource`]:
//! entering it installs a copy with the policy's severity mask, exiting
//! removes that copy again. Exiting never suppresses errors.
//!
//! | Policy | Behavior |
//! |--------|----------|
//! | [`SilentPolicy`] | claims every diagnostic, does nothing |
//! | [`CallbackPolicy`] | forwards to a closure, which decides |
//! | [`ExceptionPolicy`] | turns diagnostics in its mask into errors |
//!
//! [`DiagnosticHandler`]: crate::runtime::DiagnosticHandler
//! [`ScopedResource`]: tether_context::scope::ScopedResource

/// Implements `ScopedResource` for a policy with `installation` and
/// `severities()`.
macro_rules! impl_policy_scope {
    ($policy:ty) => {
        impl tether_context::scope::ScopedResource for $policy {
            type Entered = $policy;

            fn enter(&mut self) -> Result<Self::Entered, tether_context::error::BoxError> {
                let handler = std::sync::Arc::new(self.clone());
                let severities = self.severities();
                self.installation
                    .install(core::any::type_name::<$policy>(), handler, severities)?;
                Ok(self.clone())
            }

            fn exit(
                &mut self,
                _pending: Option<&tether_context::error::BoxError>,
            ) -> Result<bool, tether_context::error::BoxError> {
                self.installation
                    .uninstall(core::any::type_name::<$policy>());
                Ok(false)
            }
        }
    };
}

mod callback;
mod exception;
mod silent;

use std::sync::Arc;

pub use callback::CallbackPolicy;
pub use exception::ExceptionPolicy;
pub use silent::SilentPolicy;

use tether_context::error::BoxError;

use crate::error::DiagnosticsError;
use crate::runtime::{self, DiagnosticHandler, HandlerId};
use crate::severity::Severity;

/// Tracks the handler a policy installed on enter.
///
/// Clones start uninstalled, so the copy handed to the runtime and the
/// values returned from `enter` never own the installation.
#[derive(Debug, Default)]
struct Installation {
    id: Option<HandlerId>,
}

impl Clone for Installation {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl Installation {
    fn install(
        &mut self,
        policy: &'static str,
        handler: Arc<dyn DiagnosticHandler>,
        severities: Severity,
    ) -> Result<(), BoxError> {
        if self.id.is_some() {
            return Err(DiagnosticsError::AlreadyInstalled(policy).into());
        }
        self.id = Some(runtime::install(handler, severities));
        tracing::debug!(policy, %severities, "diagnostic policy entered");
        Ok(())
    }

    fn uninstall(&mut self, policy: &'static str) {
        if let Some(id) = self.id.take() {
            runtime::uninstall(id);
            tracing::debug!(policy, "diagnostic policy exited");
        }
    }

    fn is_installed(&self) -> bool {
        self.id.is_some()
    }
}
