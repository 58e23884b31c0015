//! Ordered classifier collection and its per-thread global instance.

use core::cell::RefCell;
use core::fmt;
use std::sync::Arc;

use super::{Classification, Classifier};
use crate::error::BoxError;
use crate::scope::ScopedResource;
use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// ClassifierStack
// ─────────────────────────────────────────────────────────────────────────────

/// A push/pop collection of classifiers, consulted top-most first.
///
/// A stack can be used as a standalone context object or through the
/// per-thread instance returned by [`ClassifierStack::global`], which is the
/// one [`get_scoped_resource`](super::get_scoped_resource) consults.
///
/// # Example
///
/// ```
/// use tether_context::classify::{Classification, Classifier, ClassifierStack, classifier_fn};
/// use tether_context::value::Value;
///
/// let mut stack = ClassifierStack::new();
/// stack.push(classifier_fn(Classification::Declined));
/// assert_eq!(stack.len(), 1);
///
/// assert!(stack.classify(Value::plain(1)).is_declined());
/// ```
#[derive(Default, Clone)]
pub struct ClassifierStack {
    classifiers: Vec<Arc<dyn Classifier>>,
}

impl ClassifierStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the current thread's global stack.
    ///
    /// The instance is created on first use and lives for the thread.
    #[must_use]
    pub fn global() -> GlobalClassifierStack {
        GlobalClassifierStack { _private: () }
    }

    /// Pushes a classifier onto the top of the stack.
    pub fn push<C: Classifier>(&mut self, classifier: C) {
        self.classifiers.push(Arc::new(classifier));
    }

    /// Pushes an already shared classifier onto the top of the stack.
    pub fn push_shared(&mut self, classifier: Arc<dyn Classifier>) {
        self.classifiers.push(classifier);
    }

    /// Removes and returns the top-most classifier.
    pub fn pop(&mut self) -> Option<Arc<dyn Classifier>> {
        self.classifiers.pop()
    }

    /// Returns the top-most classifier without removing it.
    #[must_use]
    pub fn top(&self) -> Option<&Arc<dyn Classifier>> {
        self.classifiers.last()
    }

    /// Returns the number of classifiers on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    /// Alias of [`len`](Self::len).
    #[must_use]
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Returns `true` if the stack holds no classifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Removes every classifier.
    pub fn reset(&mut self) {
        self.classifiers.clear();
    }
}

/// Offers the value to each classifier from the top down.
///
/// The first classifier that produces a resource wins. If all decline, the
/// value is returned in [`Classification::Declined`]. A stack can therefore be
/// pushed onto another stack as a single classifier.
impl Classifier for ClassifierStack {
    fn classify(&self, mut value: Value) -> Classification {
        for classifier in self.classifiers.iter().rev() {
            match classifier.classify(value) {
                Classification::Resource(resource) => {
                    return Classification::Resource(resource);
                }
                Classification::Declined(declined) => value = declined,
            }
        }
        Classification::Declined(value)
    }
}

/// Entering a local stack pushes its classifiers onto the global stack,
/// preserving their order. Exiting pops them again.
///
/// # Panics
///
/// `exit` panics if the global stack no longer ends with this stack's
/// classifiers.
impl ScopedResource for ClassifierStack {
    type Entered = usize;

    fn enter(&mut self) -> Result<usize, BoxError> {
        let global = ClassifierStack::global();
        for classifier in &self.classifiers {
            global.push_shared(classifier.clone());
        }
        tracing::trace!(count = self.classifiers.len(), "classifier stack pushed");
        Ok(self.classifiers.len())
    }

    fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
        let global = ClassifierStack::global();
        for classifier in self.classifiers.iter().rev() {
            let matches = global.pop().is_some_and(|top| {
                core::ptr::addr_eq(Arc::as_ptr(&top), Arc::as_ptr(classifier))
            });
            assert!(matches, "classifier stack exited out of order");
        }
        tracing::trace!(count = self.classifiers.len(), "classifier stack popped");
        Ok(false)
    }
}

impl fmt::Debug for ClassifierStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierStack")
            .field("len", &self.classifiers.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Global instance
// ─────────────────────────────────────────────────────────────────────────────

thread_local! {
    static GLOBAL_STACK: RefCell<ClassifierStack> = RefCell::new(ClassifierStack::new());
}

/// Handle to the current thread's global [`ClassifierStack`].
///
/// Obtained from [`ClassifierStack::global`]. Each thread has its own
/// instance, so classifiers pushed on one thread are invisible to others.
#[derive(Debug, Clone, Copy)]
pub struct GlobalClassifierStack {
    _private: (),
}

impl GlobalClassifierStack {
    fn with<T>(self, f: impl FnOnce(&mut ClassifierStack) -> T) -> T {
        GLOBAL_STACK.with(|stack| f(&mut stack.borrow_mut()))
    }

    /// Pushes a classifier onto the global stack.
    pub fn push<C: Classifier>(self, classifier: C) {
        self.with(|stack| stack.push(classifier));
    }

    /// Pushes an already shared classifier onto the global stack.
    pub fn push_shared(self, classifier: Arc<dyn Classifier>) {
        self.with(|stack| stack.push_shared(classifier));
    }

    /// Removes and returns the top-most global classifier.
    pub fn pop(self) -> Option<Arc<dyn Classifier>> {
        self.with(ClassifierStack::pop)
    }

    /// Returns the top-most global classifier.
    #[must_use]
    pub fn top(self) -> Option<Arc<dyn Classifier>> {
        self.with(|stack| stack.top().cloned())
    }

    /// Returns the number of classifiers on the global stack.
    #[must_use]
    pub fn len(self) -> usize {
        self.with(|stack: &mut ClassifierStack| stack.len())
    }

    /// Alias of [`len`](Self::len).
    #[must_use]
    pub fn size(self) -> usize {
        self.len()
    }

    /// Returns `true` if the global stack is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.with(|stack: &mut ClassifierStack| stack.is_empty())
    }

    /// Clears the global stack.
    pub fn reset(self) {
        self.with(ClassifierStack::reset);
    }

    /// Returns a copy of the global stack.
    #[must_use]
    pub fn snapshot(self) -> ClassifierStack {
        self.with(|stack| stack.clone())
    }

    /// Classifies `value` against a snapshot of the global stack.
    ///
    /// Builders invoked during classification may push or pop classifiers;
    /// those changes apply to later calls only.
    pub fn classify(self, value: Value) -> Classification {
        self.snapshot().classify(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ClassifierScope
// ─────────────────────────────────────────────────────────────────────────────

/// Installs a classifier on the global stack for the duration of a scope.
///
/// `enter` pushes the classifier and `exit` pops it again. Scopes must be
/// exited in reverse order of entry.
///
/// # Panics
///
/// `exit` panics if the top of the global stack is not the classifier this
/// scope pushed.
///
/// # Example
///
/// ```
/// use tether_context::classify::{Classification, ClassifierScope, ClassifierStack, classifier_fn};
/// use tether_context::scope::ScopedResource;
///
/// let mut scope = ClassifierScope::new(classifier_fn(Classification::Declined));
///
/// scope.enter().unwrap();
/// assert_eq!(ClassifierStack::global().len(), 1);
///
/// scope.exit(None).unwrap();
/// assert!(ClassifierStack::global().is_empty());
/// ```
pub struct ClassifierScope<C> {
    classifier: Arc<C>,
}

impl<C: Classifier> ClassifierScope<C> {
    /// Creates a scope for `classifier`.
    #[must_use]
    pub fn new(classifier: C) -> Self {
        Self::from_arc(Arc::new(classifier))
    }

    /// Creates a scope for an already shared classifier.
    #[must_use]
    pub fn from_arc(classifier: Arc<C>) -> Self {
        Self { classifier }
    }

    /// Returns the classifier this scope installs.
    #[must_use]
    pub fn classifier(&self) -> &Arc<C> {
        &self.classifier
    }
}

impl<C: Classifier> ScopedResource for ClassifierScope<C> {
    type Entered = Arc<C>;

    fn enter(&mut self) -> Result<Arc<C>, BoxError> {
        ClassifierStack::global().push_shared(self.classifier.clone());
        tracing::trace!(
            classifier = core::any::type_name::<C>(),
            "classifier pushed"
        );
        Ok(self.classifier.clone())
    }

    fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
        let popped = ClassifierStack::global().pop();
        let matches = popped.as_ref().is_some_and(|top| {
            core::ptr::addr_eq(Arc::as_ptr(top), Arc::as_ptr(&self.classifier))
        });
        assert!(
            matches,
            "classifier scope for {} exited out of order",
            core::any::type_name::<C>()
        );
        tracing::trace!(
            classifier = core::any::type_name::<C>(),
            "classifier popped"
        );
        Ok(false)
    }
}

impl<C> fmt::Debug for ClassifierScope<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierScope")
            .field("classifier", &core::any::type_name::<C>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classifier_fn;
    use crate::scope::ValueWrapper;

    fn claiming(tag: &'static str) -> impl Classifier {
        classifier_fn(move |value| match value {
            Value::Plain(_) => Classification::Resource(Box::new(ValueWrapper::new(tag))),
            other => Classification::Declined(other),
        })
    }

    fn claimed_tag(classification: Classification) -> &'static str {
        let mut resource = classification.into_resource().unwrap();
        *resource.enter().unwrap().downcast_ref::<&'static str>().unwrap()
    }

    #[test]
    fn top_most_classifier_wins() {
        let mut stack = ClassifierStack::new();
        stack.push(claiming("bottom"));
        stack.push(claiming("top"));

        assert_eq!(claimed_tag(stack.classify(Value::plain(()))), "top");
    }

    #[test]
    fn declining_classifier_falls_through() {
        let mut stack = ClassifierStack::new();
        stack.push(claiming("bottom"));
        stack.push(classifier_fn(Classification::Declined));

        assert_eq!(claimed_tag(stack.classify(Value::plain(()))), "bottom");
    }

    #[test]
    fn push_pop_reset() {
        let mut stack = ClassifierStack::new();
        assert!(stack.is_empty());
        assert!(stack.pop().is_none());

        stack.push(claiming("a"));
        stack.push(claiming("b"));
        assert_eq!(stack.size(), 2);
        assert!(stack.top().is_some());

        assert!(stack.pop().is_some());
        assert_eq!(stack.len(), 1);

        stack.reset();
        assert!(stack.is_empty());
    }

    #[test]
    fn stack_nests_as_a_classifier() {
        let mut inner = ClassifierStack::new();
        inner.push(claiming("inner"));

        let mut outer = ClassifierStack::new();
        outer.push(claiming("outer"));
        outer.push(inner);

        assert_eq!(outer.len(), 2);
        assert_eq!(claimed_tag(outer.classify(Value::plain(()))), "inner");

        let empty: Arc<dyn Classifier> = Arc::new(ClassifierStack::new());
        assert!(empty.classify(Value::plain(())).is_declined());
        assert!(empty.is::<ClassifierStack>());
    }

    #[test]
    fn local_stack_pushed_onto_global_stack() {
        ClassifierStack::global().reset();
        let mut local = ClassifierStack::new();
        local.push(claiming("local"));

        ClassifierStack::global().push(local);
        assert_eq!(ClassifierStack::global().len(), 1);
        assert_eq!(
            claimed_tag(ClassifierStack::global().classify(Value::plain(()))),
            "local"
        );

        ClassifierStack::global().reset();
    }

    #[test]
    fn global_stack_is_per_thread() {
        ClassifierStack::global().reset();
        ClassifierStack::global().push(claiming("main"));

        let other = std::thread::spawn(|| ClassifierStack::global().len())
            .join()
            .unwrap();
        assert_eq!(other, 0);
        assert_eq!(ClassifierStack::global().len(), 1);

        ClassifierStack::global().reset();
    }

    #[test]
    fn snapshot_is_detached() {
        ClassifierStack::global().reset();
        ClassifierStack::global().push(claiming("one"));

        let snapshot = ClassifierStack::global().snapshot();
        ClassifierStack::global().push(claiming("two"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(ClassifierStack::global().len(), 2);

        ClassifierStack::global().reset();
    }

    #[test]
    fn local_stack_scopes_onto_global() {
        ClassifierStack::global().reset();
        ClassifierStack::global().push(claiming("outer"));

        let mut local = ClassifierStack::new();
        local.push(claiming("lower"));
        local.push(claiming("upper"));

        assert_eq!(local.enter().unwrap(), 2);
        assert_eq!(ClassifierStack::global().len(), 3);
        assert_eq!(
            claimed_tag(ClassifierStack::global().classify(Value::plain(()))),
            "upper"
        );

        assert!(!local.exit(None).unwrap());
        assert_eq!(
            claimed_tag(ClassifierStack::global().classify(Value::plain(()))),
            "outer"
        );

        ClassifierStack::global().reset();
    }

    #[test]
    fn scope_pushes_and_pops() {
        ClassifierStack::global().reset();
        let mut scope = ClassifierScope::new(claiming("scoped"));

        let entered = scope.enter().unwrap();
        let top = ClassifierStack::global().top().unwrap();
        assert!(core::ptr::addr_eq(Arc::as_ptr(&top), Arc::as_ptr(&entered)));

        assert!(!scope.exit(None).unwrap());
        assert!(ClassifierStack::global().is_empty());
    }

    #[test]
    #[should_panic(expected = "exited out of order")]
    fn scope_exit_out_of_order_panics() {
        ClassifierStack::global().reset();
        let mut outer = ClassifierScope::new(claiming("outer"));
        let mut inner = ClassifierScope::new(claiming("inner"));

        outer.enter().unwrap();
        inner.enter().unwrap();
        let _ = outer.exit(None);
    }
}
