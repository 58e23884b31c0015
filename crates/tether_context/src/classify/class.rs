//! Type-keyed classifier registry.

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{Classification, ClassifierStack, Classifier};
use crate::error::BoxError;
use crate::scope::{BoxedResource, ScopedResource};
use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// TypeKey
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies the payload type a [`ClassClassifier`] builder is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a `TypeKey` for `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ClassClassifier
// ─────────────────────────────────────────────────────────────────────────────

type Builder = dyn Fn(Box<dyn Any + Send>) -> BoxedResource + Send + Sync;

struct Entry {
    key: TypeKey,
    builder: Arc<Builder>,
}

/// A classifier that maps payload types to resource builders.
///
/// Only [`Value::Plain`] values are considered, and a builder applies only to
/// payloads of exactly the registered type. Registering a type again replaces
/// the previous builder.
///
/// Clones share the same registry, so entries added through one clone are
/// visible through all of them.
///
/// # As a Scoped Resource
///
/// Entering a `ClassClassifier` pushes it onto the current thread's global
/// [`ClassifierStack`]; exiting pops it.
///
/// ```
/// use tether_context::classify::{ClassClassifier, ClassifierStack};
/// use tether_context::scope::{ScopedResource, ValueWrapper};
///
/// struct Filter(String);
///
/// let mut classifier = ClassClassifier::new()
///     .with::<Filter, _, _>(|filter| ValueWrapper::new(filter.0));
///
/// classifier.enter().unwrap();
/// assert_eq!(ClassifierStack::global().len(), 1);
///
/// classifier.exit(None).unwrap();
/// assert!(ClassifierStack::global().is_empty());
/// ```
///
/// # Panics
///
/// `exit` panics if the top of the global stack is not this classifier,
/// which means scopes were exited out of order.
#[derive(Clone, Default)]
pub struct ClassClassifier {
    registry: Arc<RwLock<HashMap<TypeId, Entry>>>,
}

impl ClassClassifier {
    /// Creates an empty classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `builder` for payloads of type `T` and returns `self`.
    #[must_use]
    pub fn with<T, F, R>(self, builder: F) -> Self
    where
        T: Any + Send,
        F: Fn(T) -> R + Send + Sync + 'static,
        R: ScopedResource + Send + 'static,
        R::Entered: Send + 'static,
    {
        self.register::<T, F, R>(builder);
        self
    }

    /// Registers `builder` for payloads of type `T`.
    pub fn register<T, F, R>(&self, builder: F) -> &Self
    where
        T: Any + Send,
        F: Fn(T) -> R + Send + Sync + 'static,
        R: ScopedResource + Send + 'static,
        R::Entered: Send + 'static,
    {
        let key = TypeKey::of::<T>();
        let build: Arc<Builder> = Arc::new(move |payload: Box<dyn Any + Send>| {
            let value = payload
                .downcast::<T>()
                .expect("payload type is checked before building (this is a bug)");
            Box::new(builder(*value)) as BoxedResource
        });

        self.registry.write().insert(
            key.type_id(),
            Entry {
                key,
                builder: build,
            },
        );
        tracing::debug!(payload = key.type_name(), "classifier builder registered");
        self
    }

    /// Registers `R::from` as the builder for payloads of type `T`.
    ///
    /// ```
    /// use tether_context::classify::ClassClassifier;
    /// use tether_context::scope::ValueWrapper;
    ///
    /// let classifier = ClassClassifier::new();
    /// classifier.register_from::<u16, ValueWrapper<u16>>();
    /// assert!(classifier.contains::<u16>());
    /// ```
    pub fn register_from<T, R>(&self) -> &Self
    where
        T: Any + Send,
        R: From<T> + ScopedResource + Send + 'static,
        R::Entered: Send + 'static,
    {
        self.register::<T, _, R>(R::from)
    }

    /// Removes the builder for `T`, returning whether one was registered.
    pub fn remove<T: Any>(&self) -> bool {
        self.registry.write().remove(&TypeId::of::<T>()).is_some()
    }

    /// Returns `true` if a builder is registered for `T`.
    #[must_use]
    pub fn contains<T: Any>(&self) -> bool {
        self.registry.read().contains_key(&TypeId::of::<T>())
    }

    /// Returns the keys of every registered builder.
    #[must_use]
    pub fn registered(&self) -> Vec<TypeKey> {
        self.registry.read().values().map(|entry| entry.key).collect()
    }

    /// Returns the number of registered builders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    /// Returns `true` if no builders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }

    fn shares_registry(&self, other: &ClassClassifier) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry)
    }
}

impl Classifier for ClassClassifier {
    fn classify(&self, value: Value) -> Classification {
        let payload = match value {
            Value::Plain(payload) => payload,
            other => return Classification::Declined(other),
        };

        let builder = self
            .registry
            .read()
            .get(&Any::type_id(&*payload))
            .map(|entry| entry.builder.clone());

        match builder {
            Some(builder) => Classification::Resource(builder(payload)),
            None => Classification::Declined(Value::Plain(payload)),
        }
    }
}

impl ScopedResource for ClassClassifier {
    type Entered = ClassClassifier;

    fn enter(&mut self) -> Result<Self::Entered, BoxError> {
        ClassifierStack::global().push(self.clone());
        tracing::trace!(builders = self.len(), "class classifier pushed");
        Ok(self.clone())
    }

    fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
        let popped = ClassifierStack::global()
            .pop()
            .and_then(|top| top.downcast_arc::<ClassClassifier>().ok());
        assert!(
            popped.is_some_and(|top| top.shares_registry(self)),
            "class classifier exited out of order"
        );
        tracing::trace!("class classifier popped");
        Ok(false)
    }
}

impl fmt::Debug for ClassClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassClassifier")
            .field("registered", &self.registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ValueWrapper;

    struct Dn(String);

    struct Filter(&'static str);

    fn entered_string(classification: Classification) -> String {
        let mut resource = classification.into_resource().unwrap();
        *resource.enter().unwrap().downcast::<String>().unwrap()
    }

    #[test]
    fn builds_registered_type() {
        let classifier =
            ClassClassifier::new().with::<Dn, _, _>(|dn| ValueWrapper::new(format!("dn:{}", dn.0)));

        let classification = classifier.classify(Value::plain(Dn("cn=root".into())));
        assert_eq!(entered_string(classification), "dn:cn=root");
    }

    #[test]
    fn declines_unregistered_type() {
        let classifier = ClassClassifier::new().with::<Dn, _, _>(|dn| ValueWrapper::new(dn.0));

        let classification = classifier.classify(Value::plain(Filter("(objectClass=*)")));
        let Classification::Declined(Value::Plain(payload)) = classification else {
            panic!("expected the plain value back");
        };
        assert_eq!(payload.downcast_ref::<Filter>().unwrap().0, "(objectClass=*)");
    }

    #[test]
    fn declines_non_plain_values() {
        let classifier = ClassClassifier::new().with::<u8, _, _>(ValueWrapper::new);
        let value = Value::resource(ValueWrapper::new(1_u8));
        assert!(classifier.classify(value).is_declined());
    }

    #[test]
    fn last_registration_wins() {
        let classifier = ClassClassifier::new()
            .with::<Dn, _, _>(|_| ValueWrapper::new(String::from("first")))
            .with::<Dn, _, _>(|_| ValueWrapper::new(String::from("second")));

        assert_eq!(classifier.len(), 1);
        let classification = classifier.classify(Value::plain(Dn(String::new())));
        assert_eq!(entered_string(classification), "second");
    }

    #[test]
    fn clones_share_registry() {
        let classifier = ClassClassifier::new();
        let clone = classifier.clone();

        clone.register_from::<String, ValueWrapper<String>>();
        assert!(classifier.contains::<String>());
        assert_eq!(classifier.registered(), vec![TypeKey::of::<String>()]);

        assert!(classifier.remove::<String>());
        assert!(!classifier.remove::<String>());
        assert!(clone.is_empty());
    }

    #[test]
    fn scope_balances_global_stack() {
        ClassifierStack::global().reset();
        let mut classifier = ClassClassifier::new().with::<Dn, _, _>(|dn| ValueWrapper::new(dn.0));

        let entered = classifier.enter().unwrap();
        assert!(entered.contains::<Dn>());
        assert_eq!(ClassifierStack::global().len(), 1);

        assert!(!classifier.exit(None).unwrap());
        assert!(ClassifierStack::global().is_empty());
    }

    #[test]
    #[should_panic(expected = "exited out of order")]
    fn exit_with_foreign_top_panics() {
        ClassifierStack::global().reset();
        let mut outer = ClassClassifier::new();
        let mut inner = ClassClassifier::new();

        outer.enter().unwrap();
        inner.enter().unwrap();
        let _ = outer.exit(None);
    }
}
