//! Turning arbitrary values into scoped resources.
//!
//! A [`Classifier`] inspects a [`Value`] and either produces a
//! [`BoxedResource`] or declines, handing the value back. Classifiers are
//! consulted through a [`ClassifierStack`], top-most first; when every
//! classifier declines, [`DefaultClassifier`] supplies the fallback.
//!
//! # Example
//!
//! ```
//! use tether_context::classify::{ClassClassifier, get_scoped_resource};
//! use tether_context::scope::{ScopedResource, ValueWrapper};
//! use tether_context::value::Value;
//!
//! struct Dn(&'static str);
//!
//! let classifier = ClassClassifier::new()
//!     .with::<Dn, _, _>(|dn| ValueWrapper::new(dn.0.to_uppercase()));
//!
//! let mut scope = classifier.clone();
//! scope.enter().unwrap();
//!
//! let mut resource = get_scoped_resource(Value::plain(Dn("cn=admin")));
//! let entered = resource.enter().unwrap();
//! assert_eq!(entered.downcast_ref::<String>().unwrap(), "CN=ADMIN");
//!
//! scope.exit(None).unwrap();
//! ```

mod class;
mod default;
mod stack;

use core::fmt;

use downcast_rs::{DowncastSync, impl_downcast};

pub use class::{ClassClassifier, TypeKey};
pub use default::DefaultClassifier;
pub use stack::{ClassifierScope, ClassifierStack, GlobalClassifierStack};

use crate::scope::BoxedResource;
use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Classifier
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of [`Classifier::classify`].
pub enum Classification {
    /// The classifier produced a resource for the value.
    Resource(BoxedResource),
    /// The classifier does not handle the value; ownership is returned.
    Declined(Value),
}

impl Classification {
    /// Returns the produced resource, or `None` if the value was declined.
    #[must_use]
    pub fn into_resource(self) -> Option<BoxedResource> {
        match self {
            Classification::Resource(resource) => Some(resource),
            Classification::Declined(_) => None,
        }
    }

    /// Returns `true` if the value was declined.
    #[must_use]
    pub fn is_declined(&self) -> bool {
        matches!(self, Classification::Declined(_))
    }
}

impl fmt::Debug for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Resource(resource) => f
                .debug_tuple("Resource")
                .field(&resource.resource_name())
                .finish(),
            Classification::Declined(value) => f.debug_tuple("Declined").field(value).finish(),
        }
    }
}

/// Converts values into scoped resources.
///
/// Implementors must be `Send + Sync` so a classifier can be shared between
/// stacks. Classifiers support downcasting:
///
/// ```
/// use std::sync::Arc;
/// use tether_context::classify::{Classifier, DefaultClassifier};
///
/// let classifier: Arc<dyn Classifier> = Arc::new(DefaultClassifier);
/// assert!(classifier.is::<DefaultClassifier>());
/// ```
pub trait Classifier: DowncastSync {
    /// Classifies `value`, declining with [`Classification::Declined`] when
    /// this classifier does not handle it.
    fn classify(&self, value: Value) -> Classification;
}

impl_downcast!(sync Classifier);

/// A [`Classifier`] backed by a closure.
///
/// Created with [`classifier_fn`].
pub struct FnClassifier<F> {
    func: F,
}

impl<F> Classifier for FnClassifier<F>
where
    F: Fn(Value) -> Classification + Send + Sync + 'static,
{
    fn classify(&self, value: Value) -> Classification {
        (self.func)(value)
    }
}

/// Wraps a closure as a [`Classifier`].
///
/// ```
/// use tether_context::classify::{Classification, Classifier, classifier_fn};
/// use tether_context::value::Value;
///
/// let declines_all = classifier_fn(Classification::Declined);
/// assert!(declines_all.classify(Value::plain(1)).is_declined());
/// ```
pub fn classifier_fn<F>(func: F) -> FnClassifier<F>
where
    F: Fn(Value) -> Classification + Send + Sync + 'static,
{
    FnClassifier { func }
}

/// Returns a scoped resource for `value`.
///
/// The current thread's global [`ClassifierStack`] is consulted top-down; if
/// every classifier declines, [`DefaultClassifier`] resolves the value. This
/// never fails.
pub fn get_scoped_resource(value: Value) -> BoxedResource {
    match ClassifierStack::global().classify(value) {
        Classification::Resource(resource) => resource,
        Classification::Declined(value) => DefaultClassifier::instance().resolve(value),
    }
}
