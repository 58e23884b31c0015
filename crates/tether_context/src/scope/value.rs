//! Trivial value wrapper.

use super::ScopedResource;
use crate::error::{BoxError, ContextError};

/// A no-op [`ScopedResource`] that carries a plain value through the protocol.
///
/// `enter` moves the value out to user code and `exit` never suppresses
/// anything. This is the fallback used by
/// [`DefaultClassifier`](crate::classify::DefaultClassifier) so that values
/// without resource semantics can still be passed to the executor.
///
/// # Example
///
/// ```
/// use tether_context::scope::{ScopedResource, ValueWrapper};
///
/// let mut wrapper = ValueWrapper::new("directory");
/// assert_eq!(wrapper.value(), Some(&"directory"));
///
/// assert_eq!(wrapper.enter().unwrap(), "directory");
/// assert!(!wrapper.exit(None).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueWrapper<T> {
    value: Option<T>,
}

impl<T> ValueWrapper<T> {
    /// Wraps `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Returns the wrapped value, or `None` once it has been entered.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Unwraps the value, or returns `None` once it has been entered.
    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

impl<T> From<T> for ValueWrapper<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> ScopedResource for ValueWrapper<T> {
    type Entered = T;

    fn enter(&mut self) -> Result<T, BoxError> {
        self.value
            .take()
            .ok_or_else(|| ContextError::AlreadyEntered(core::any::type_name::<Self>()).into())
    }

    fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_returns_wrapped_value() {
        let mut wrapper = ValueWrapper::new(vec![1, 2, 3]);
        assert_eq!(wrapper.enter().unwrap(), vec![1, 2, 3]);
        assert_eq!(wrapper.value(), None);
    }

    #[test]
    fn exit_never_suppresses() {
        let mut wrapper = ValueWrapper::new(1);
        let pending: BoxError = "pending".into();

        wrapper.enter().unwrap();
        assert!(!wrapper.exit(Some(&pending)).unwrap());
        assert!(!wrapper.exit(None).unwrap());
    }

    #[test]
    fn second_enter_fails() {
        let mut wrapper = ValueWrapper::new("once");
        wrapper.enter().unwrap();

        let err = wrapper.enter().unwrap_err();
        let err = err.downcast_ref::<ContextError>().unwrap();
        assert!(matches!(err, ContextError::AlreadyEntered(_)));
    }
}
