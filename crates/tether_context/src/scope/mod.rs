//! The scoped-resource contract.
//!
//! A [`ScopedResource`] is acquired with [`enter`](ScopedResource::enter) and
//! released with [`exit`](ScopedResource::exit). The executor guarantees that
//! every successfully entered resource is exited exactly once, in reverse
//! order, whatever happens in between.
//!
//! # Provided Resources
//!
//! | Type | Entered value | Release |
//! |------|---------------|---------|
//! | [`ValueWrapper<T>`] | the wrapped `T` | nothing |
//! | [`HandleResource`] | the [`Handle`] | looked up in the release table |
//! | [`BoxedResource`] | `Box<dyn Any + Send>` | delegated to the boxed resource |
//!
//! # Example
//!
//! ```
//! use tether_context::error::BoxError;
//! use tether_context::scope::ScopedResource;
//!
//! struct Connection {
//!     open: bool,
//! }
//!
//! impl ScopedResource for Connection {
//!     type Entered = &'static str;
//!
//!     fn enter(&mut self) -> Result<Self::Entered, BoxError> {
//!         self.open = true;
//!         Ok("ldap://localhost")
//!     }
//!
//!     fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
//!         self.open = false;
//!         Ok(false)
//!     }
//! }
//! ```

mod handle;
mod value;

use core::any::Any;

use downcast_rs::{Downcast, impl_downcast};

pub use handle::{Handle, HandleMetadata, HandleResource, RawHandle, Release, release_table};
pub use value::ValueWrapper;

use crate::error::BoxError;

// ─────────────────────────────────────────────────────────────────────────────
// ScopedResource
// ─────────────────────────────────────────────────────────────────────────────

/// A resource with paired acquire/release semantics.
///
/// # Lifecycle
///
/// 1. [`enter`](Self::enter) is called once. If it fails, the resource is
///    considered never entered and `exit` is **not** called for it.
/// 2. [`exit`](Self::exit) is called once after a successful `enter`, with
///    the error currently propagating (if any).
///
/// # Suppression
///
/// `exit` returns `Ok(true)` to consume the pending error (propagation stops
/// here) and `Ok(false)` to let it continue. Returning `Err` replaces the
/// pending error with the new one; remaining resources are still exited.
pub trait ScopedResource {
    /// The value exposed to user code while the resource is held.
    type Entered;

    /// Acquires the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if acquisition fails. The resource will not be exited.
    fn enter(&mut self) -> Result<Self::Entered, BoxError>;

    /// Releases the resource and decides whether `pending` is suppressed.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing fails. The error replaces `pending`.
    fn exit(&mut self, pending: Option<&BoxError>) -> Result<bool, BoxError>;
}

/// Object-safe exit half of [`ScopedResource`], used by the executor to
/// unwind heterogeneous resources uniformly.
pub trait ExitScope {
    /// Calls [`ScopedResource::exit`].
    ///
    /// # Errors
    ///
    /// Propagates the error returned by the underlying `exit`.
    fn exit_scope(&mut self, pending: Option<&BoxError>) -> Result<bool, BoxError>;
}

impl<R: ScopedResource> ExitScope for R {
    fn exit_scope(&mut self, pending: Option<&BoxError>) -> Result<bool, BoxError> {
        self.exit(pending)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type-erased resources
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased [`ScopedResource`].
///
/// Implemented for every `ScopedResource + Send + 'static` whose entered value
/// is `Send + 'static`. Classifiers produce these so that values of unrelated
/// types can be collected into one executor.
///
/// Supports downcasting back to the concrete type:
///
/// ```
/// use tether_context::scope::{BoxedResource, ValueWrapper};
///
/// let boxed: BoxedResource = Box::new(ValueWrapper::new(7_u32));
/// assert!(boxed.is::<ValueWrapper<u32>>());
/// ```
pub trait ErasedResource: Downcast + Send {
    /// Acquires the resource, boxing the entered value.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by the underlying `enter`.
    fn enter_erased(&mut self) -> Result<Box<dyn Any + Send>, BoxError>;

    /// Releases the resource.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by the underlying `exit`.
    fn exit_erased(&mut self, pending: Option<&BoxError>) -> Result<bool, BoxError>;

    /// Returns the type name of the implementing type.
    ///
    /// Prefer the inherent `resource_name` on `dyn ErasedResource`, which
    /// looks through nested boxes.
    fn erased_type_name(&self) -> &'static str;
}

impl_downcast!(ErasedResource);

impl dyn ErasedResource {
    /// Returns the concrete resource type name for logging.
    ///
    /// A [`BoxedResource`] is itself an `ErasedResource`, so a boxed box
    /// reports the innermost resource rather than the box.
    #[must_use]
    pub fn resource_name(&self) -> &'static str {
        match self.downcast_ref::<BoxedResource>() {
            Some(inner) => inner.resource_name(),
            None => self.erased_type_name(),
        }
    }
}

impl<R> ErasedResource for R
where
    R: ScopedResource + Send + 'static,
    R::Entered: Send + 'static,
{
    fn enter_erased(&mut self) -> Result<Box<dyn Any + Send>, BoxError> {
        self.enter().map(erase)
    }

    fn exit_erased(&mut self, pending: Option<&BoxError>) -> Result<bool, BoxError> {
        self.exit(pending)
    }

    fn erased_type_name(&self) -> &'static str {
        core::any::type_name::<R>()
    }
}

/// A heap-allocated, type-erased scoped resource.
pub type BoxedResource = Box<dyn ErasedResource>;

impl ScopedResource for BoxedResource {
    type Entered = Box<dyn Any + Send>;

    fn enter(&mut self) -> Result<Self::Entered, BoxError> {
        (**self).enter_erased()
    }

    fn exit(&mut self, pending: Option<&BoxError>) -> Result<bool, BoxError> {
        (**self).exit_erased(pending)
    }
}

/// Boxes an entered value, flattening values that are already boxed `Any`.
///
/// Wrapped plain values enter as `Box<dyn Any + Send>`; without flattening
/// they would be boxed twice and no longer downcast to their payload type.
pub(crate) fn erase<T: Any + Send>(value: T) -> Box<dyn Any + Send> {
    let boxed: Box<dyn Any + Send> = Box::new(value);
    match boxed.downcast::<Box<dyn Any + Send>>() {
        Ok(inner) => *inner,
        Err(boxed) => boxed,
    }
}
