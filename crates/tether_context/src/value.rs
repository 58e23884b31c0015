//! Values accepted by the executor.

use core::any::{Any, TypeId};
use core::fmt;

use crate::scope::{BoxedResource, Handle, ScopedResource};

/// Anything that can be handed to [`with`](crate::executor::with) or
/// [`run_with`](crate::executor::run_with).
///
/// The variant decides how a value is classified by default:
///
/// | Variant | Default classification |
/// |---------|------------------------|
/// | [`Resource`](Value::Resource) | used as-is |
/// | [`Handle`](Value::Handle) | wrapped in [`HandleResource`](crate::scope::HandleResource) |
/// | [`Plain`](Value::Plain) | wrapped in [`ValueWrapper`](crate::scope::ValueWrapper) |
///
/// Custom classifiers see the value first and may claim any variant.
pub enum Value {
    /// A value that is already a scoped resource.
    Resource(BoxedResource),
    /// An opaque native handle.
    Handle(Handle),
    /// Any other value.
    Plain(Box<dyn Any + Send>),
}

impl Value {
    /// Creates a [`Value::Resource`] from a scoped resource.
    ///
    /// An already boxed [`BoxedResource`] is stored as-is rather than boxed
    /// again, so downcasts keep seeing the concrete resource.
    ///
    /// ```
    /// use tether_context::scope::{BoxedResource, ValueWrapper};
    /// use tether_context::value::Value;
    ///
    /// let boxed: BoxedResource = Box::new(ValueWrapper::new(1_u8));
    /// let Value::Resource(resource) = Value::resource(boxed) else {
    ///     unreachable!();
    /// };
    /// assert!(resource.is::<ValueWrapper<u8>>());
    /// ```
    pub fn resource<R>(resource: R) -> Self
    where
        R: ScopedResource + Send + 'static,
        R::Entered: Send + 'static,
    {
        let erased: Box<dyn Any + Send> = Box::new(resource);
        match erased.downcast::<BoxedResource>() {
            Ok(boxed) => Value::Resource(*boxed),
            Err(erased) => match erased.downcast::<R>() {
                Ok(resource) => Value::Resource(resource),
                Err(_) => unreachable!("erased value is an `R` (this is a bug)"),
            },
        }
    }

    /// Creates a [`Value::Handle`].
    pub fn handle(handle: Handle) -> Self {
        Value::Handle(handle)
    }

    /// Creates a [`Value::Plain`].
    pub fn plain<T: Any + Send>(value: T) -> Self {
        Value::Plain(Box::new(value))
    }

    /// Returns the payload's [`TypeId`] for plain values.
    #[must_use]
    pub fn plain_type_id(&self) -> Option<TypeId> {
        match self {
            Value::Plain(payload) => Some(Any::type_id(&**payload)),
            Value::Resource(_) | Value::Handle(_) => None,
        }
    }

    /// Returns a short description of the variant for logging.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Resource(_) => "resource",
            Value::Handle(_) => "handle",
            Value::Plain(_) => "plain",
        }
    }
}

impl From<BoxedResource> for Value {
    fn from(resource: BoxedResource) -> Self {
        Value::Resource(resource)
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Value::Handle(handle)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Resource(resource) => f
                .debug_tuple("Resource")
                .field(&resource.resource_name())
                .finish(),
            Value::Handle(handle) => f.debug_tuple("Handle").field(handle).finish(),
            Value::Plain(_) => f.debug_tuple("Plain").finish_non_exhaustive(),
        }
    }
}
