//! The fallback classifier.

use core::any::Any;

use super::{Classification, Classifier};
use crate::scope::{BoxedResource, HandleResource, ValueWrapper};
use crate::value::Value;

/// Fallback classifier used when every classifier on the stack declines.
///
/// | Value | Resource |
/// |-------|----------|
/// | [`Value::Resource`] | the resource itself, unwrapped |
/// | [`Value::Handle`] | [`HandleResource`] |
/// | [`Value::Plain`] | [`ValueWrapper`] entering the original payload |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultClassifier;

static INSTANCE: DefaultClassifier = DefaultClassifier;

impl DefaultClassifier {
    /// Returns the shared instance.
    #[must_use]
    pub fn instance() -> &'static DefaultClassifier {
        &INSTANCE
    }

    /// Converts `value` into a resource. Never fails.
    ///
    /// ```
    /// use tether_context::classify::DefaultClassifier;
    /// use tether_context::scope::ScopedResource;
    /// use tether_context::value::Value;
    ///
    /// let mut resource = DefaultClassifier::instance().resolve(Value::plain("uid=jdoe"));
    /// let entered = resource.enter().unwrap();
    /// assert_eq!(entered.downcast_ref::<&str>(), Some(&"uid=jdoe"));
    /// ```
    #[must_use]
    pub fn resolve(&self, value: Value) -> BoxedResource {
        match value {
            Value::Resource(resource) => resource,
            Value::Handle(handle) => Box::new(HandleResource::new(handle)),
            Value::Plain(payload) => Box::new(ValueWrapper::<Box<dyn Any + Send>>::new(payload)),
        }
    }
}

impl Classifier for DefaultClassifier {
    fn classify(&self, value: Value) -> Classification {
        Classification::Resource(self.resolve(value))
    }
}
