//! Running a callback inside several scoped resources.
//!
//! The [`Executor`] enters its resources in order, calls the callback with
//! the entered values, then exits every successfully entered resource in
//! reverse order. Errors flow through the unwind:
//!
//! - an `enter` failure stops acquisition and skips the callback;
//! - an `exit` returning `Ok(true)` suppresses the pending error;
//! - an `exit` returning `Err` replaces the pending error and the unwind
//!   continues.
//!
//! Whatever is still pending after the last exit is returned to the caller.
//!
//! # Example
//!
//! ```
//! use tether_context::executor::run_with;
//! use tether_context::value::Value;
//!
//! let joined = run_with([Value::plain("ou=people"), Value::plain(2_u32)], |mut args| {
//!     let base: &str = args.take(0)?;
//!     let depth: u32 = args.take(1)?;
//!     Ok(format!("{base}/{depth}"))
//! })
//! .unwrap();
//!
//! assert_eq!(joined.as_deref(), Some("ou=people/2"));
//! ```

use core::any::{Any, type_name};
use core::fmt;
use std::panic::{self, AssertUnwindSafe};

use variadics_please::all_tuples;

use crate::classify::get_scoped_resource;
use crate::error::{BoxError, ContextError};
use crate::scope::{BoxedResource, ExitScope, ScopedResource};
use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// ScopedResources
// ─────────────────────────────────────────────────────────────────────────────

/// A fixed or dynamic group of scoped resources entered together.
///
/// Implemented for `()`, tuples of up to 12 [`ScopedResource`]s, and
/// `Vec<R>`. The entered values have the same shape as the group.
pub trait ScopedResources {
    /// Entered values, in entry order.
    type Entered;

    /// Enters every resource in order, incrementing `entered` after each
    /// success.
    ///
    /// # Errors
    ///
    /// Returns the first `enter` error. Resources after it are not entered.
    fn enter_all(&mut self, entered: &mut usize) -> Result<Self::Entered, BoxError>;

    /// Returns the exit halves of every resource, in entry order.
    fn exit_scopes(&mut self) -> Vec<&mut dyn ExitScope>;
}

impl ScopedResources for () {
    type Entered = ();

    fn enter_all(&mut self, _entered: &mut usize) -> Result<(), BoxError> {
        Ok(())
    }

    fn exit_scopes(&mut self) -> Vec<&mut dyn ExitScope> {
        Vec::new()
    }
}

impl<R: ScopedResource> ScopedResources for Vec<R> {
    type Entered = Vec<R::Entered>;

    fn enter_all(&mut self, entered: &mut usize) -> Result<Self::Entered, BoxError> {
        let mut values = Vec::with_capacity(self.len());
        for resource in self.iter_mut() {
            values.push(resource.enter()?);
            *entered += 1;
        }
        Ok(values)
    }

    fn exit_scopes(&mut self) -> Vec<&mut dyn ExitScope> {
        self.iter_mut()
            .map(|resource| resource as &mut dyn ExitScope)
            .collect()
    }
}

macro_rules! impl_scoped_resources_tuple {
    ($(($R:ident, $r:ident)),*) => {
        impl<$($R: ScopedResource),*> ScopedResources for ($($R,)*) {
            type Entered = ($($R::Entered,)*);

            fn enter_all(&mut self, entered: &mut usize) -> Result<Self::Entered, BoxError> {
                let ($($r,)*) = self;
                Ok(($({
                    let value = $r.enter()?;
                    *entered += 1;
                    value
                },)*))
            }

            fn exit_scopes(&mut self) -> Vec<&mut dyn ExitScope> {
                let ($($r,)*) = self;
                vec![$($r as &mut dyn ExitScope),*]
            }
        }
    };
}

// Tuples of 1 to 12 resources
all_tuples!(impl_scoped_resources_tuple, 1, 12, R, r);

// ─────────────────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────────────────

/// Runs callbacks inside a group of scoped resources.
#[derive(Debug)]
pub struct Executor<S> {
    resources: S,
}

impl<S: ScopedResources> Executor<S> {
    /// Creates an executor over `resources`.
    #[must_use]
    pub fn new(resources: S) -> Self {
        Self { resources }
    }

    /// Returns the resource group.
    #[must_use]
    pub fn resources(&self) -> &S {
        &self.resources
    }

    /// Consumes the executor and returns the resource group.
    #[must_use]
    pub fn into_resources(self) -> S {
        self.resources
    }

    /// Enters the resources, calls `func`, and exits the entered resources
    /// in reverse order.
    ///
    /// Returns `Ok(Some(value))` when `func` completed and no exit raised,
    /// and `Ok(None)` when a propagating error was suppressed by an exit.
    ///
    /// # Errors
    ///
    /// Returns the error still pending after the unwind: an `enter` error,
    /// the error from `func`, or the last error raised by an `exit`.
    ///
    /// # Panics
    ///
    /// A panic in `enter` or `func` is resumed after every entered resource
    /// has been exited. Exits see no pending error and cannot stop the panic.
    pub fn run<T, F>(&mut self, func: F) -> Result<Option<T>, BoxError>
    where
        F: FnOnce(S::Entered) -> Result<T, BoxError>,
    {
        let mut entered = 0;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            match self.resources.enter_all(&mut entered) {
                Ok(values) => match func(values) {
                    Ok(value) => (Some(value), None),
                    Err(error) => (None, Some(error)),
                },
                Err(error) => {
                    tracing::debug!(entered, %error, "acquisition failed");
                    (None, Some(error))
                }
            }
        }));

        let (output, pending) = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                tracing::warn!(entered, "panic while resources were held, unwinding");
                if let Some(error) = self.unwind(entered, None) {
                    tracing::warn!(%error, "release error discarded while panicking");
                }
                panic::resume_unwind(payload);
            }
        };

        match self.unwind(entered, pending) {
            Some(error) => Err(error),
            None => Ok(output),
        }
    }

    /// Exits the first `entered` resources in reverse order and returns the
    /// error still pending afterwards.
    fn unwind(&mut self, entered: usize, mut pending: Option<BoxError>) -> Option<BoxError> {
        let scopes = self.resources.exit_scopes();
        for (position, scope) in scopes.into_iter().enumerate().take(entered).rev() {
            tracing::trace!(position, "exiting resource");
            match scope.exit_scope(pending.as_ref()) {
                Ok(true) => {
                    if let Some(error) = pending.take() {
                        tracing::debug!(position, %error, "error suppressed");
                    }
                }
                Ok(false) => {}
                Err(error) => {
                    if let Some(displaced) = pending.replace(error) {
                        tracing::warn!(
                            position,
                            %displaced,
                            "release error replaced the pending error"
                        );
                    }
                }
            }
        }
        pending
    }
}

/// Classifies each value and returns an executor over the results.
///
/// Every value goes through
/// [`get_scoped_resource`](crate::classify::get_scoped_resource), so the
/// classifiers on the current thread's global stack apply.
pub fn with<I>(values: I) -> Executor<Vec<BoxedResource>>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let resources: Vec<_> = values
        .into_iter()
        .map(|value| get_scoped_resource(value.into()))
        .collect();
    tracing::trace!(count = resources.len(), "resources classified");
    Executor::new(resources)
}

/// Classifies `values`, then runs `func` inside them.
///
/// `func` receives the entered values as [`EnteredArgs`], positionally.
///
/// # Errors
///
/// See [`Executor::run`].
pub fn run_with<I, T, F>(values: I, func: F) -> Result<Option<T>, BoxError>
where
    I: IntoIterator,
    I::Item: Into<Value>,
    F: FnOnce(EnteredArgs) -> Result<T, BoxError>,
{
    with(values).run(|entered| func(EnteredArgs::new(entered)))
}

/// Runs `func` inside a statically typed group of resources.
///
/// ```
/// use tether_context::executor::run_scoped;
/// use tether_context::scope::ValueWrapper;
///
/// let sum = run_scoped(
///     (ValueWrapper::new(2), ValueWrapper::new(3)),
///     |(a, b)| Ok(a + b),
/// )
/// .unwrap();
/// assert_eq!(sum, Some(5));
/// ```
///
/// # Errors
///
/// See [`Executor::run`].
pub fn run_scoped<S, T, F>(resources: S, func: F) -> Result<Option<T>, BoxError>
where
    S: ScopedResources,
    F: FnOnce(S::Entered) -> Result<T, BoxError>,
{
    Executor::new(resources).run(func)
}

// ─────────────────────────────────────────────────────────────────────────────
// EnteredArgs
// ─────────────────────────────────────────────────────────────────────────────

/// Positional entered values handed to [`run_with`] callbacks.
pub struct EnteredArgs {
    values: Vec<Option<Box<dyn Any + Send>>>,
}

impl EnteredArgs {
    /// Wraps entered values.
    #[must_use]
    pub fn new(values: Vec<Box<dyn Any + Send>>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    /// Returns the number of positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Moves the value at `index` out, downcast to `T`.
    ///
    /// On a type mismatch the value stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::MissingArgument`] if `index` is out of range or
    /// already taken, and [`ContextError::ArgumentType`] on a type mismatch.
    pub fn take<T: Any>(&mut self, index: usize) -> Result<T, ContextError> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or(ContextError::MissingArgument(index))?;
        let value = slot.take().ok_or(ContextError::MissingArgument(index))?;

        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                *slot = Some(value);
                Err(ContextError::ArgumentType {
                    index,
                    expected: type_name::<T>(),
                })
            }
        }
    }

    /// Borrows the value at `index` as `T`.
    #[must_use]
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.as_ref()?.downcast_ref::<T>()
    }

    /// Returns the remaining values; taken positions are `None`.
    #[must_use]
    pub fn into_vec(self) -> Vec<Option<Box<dyn Any + Send>>> {
        self.values
    }
}

impl fmt::Debug for EnteredArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnteredArgs")
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ValueWrapper;

    struct Failing;

    impl ScopedResource for Failing {
        type Entered = ();

        fn enter(&mut self) -> Result<(), BoxError> {
            Err("bind failed".into())
        }

        fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
            panic!("exit called for a resource that never entered");
        }
    }

    struct Suppressing;

    impl ScopedResource for Suppressing {
        type Entered = ();

        fn enter(&mut self) -> Result<(), BoxError> {
            Ok(())
        }

        fn exit(&mut self, pending: Option<&BoxError>) -> Result<bool, BoxError> {
            Ok(pending.is_some())
        }
    }

    #[test]
    fn empty_group_runs_callback() {
        assert_eq!(run_scoped((), |()| Ok(1)).unwrap(), Some(1));
    }

    #[test]
    fn enter_failure_skips_callback() {
        let mut called = false;
        let err = run_scoped((ValueWrapper::new(1), Failing), |_| {
            called = true;
            Ok(())
        })
        .unwrap_err();

        assert!(!called);
        assert_eq!(err.to_string(), "bind failed");
    }

    #[test]
    fn suppressed_callback_error_yields_none() {
        let result = run_scoped((Suppressing,), |_| -> Result<(), BoxError> {
            Err("search failed".into())
        });
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn vec_group_enters_in_order() {
        let resources = vec![ValueWrapper::new('a'), ValueWrapper::new('b')];
        let joined = run_scoped(resources, |values| Ok(values.into_iter().collect::<String>()));
        assert_eq!(joined.unwrap().as_deref(), Some("ab"));
    }

    #[test]
    fn executor_keeps_resources() {
        let mut executor = Executor::new((ValueWrapper::new(5_u8),));
        assert_eq!(executor.run(|(v,)| Ok(v)).unwrap(), Some(5));
        assert_eq!(executor.resources().0.value(), None);
    }

    #[test]
    fn args_take_and_get() {
        let values: Vec<Box<dyn Any + Send>> = vec![Box::new(1_i32), Box::new("two")];
        let mut args = EnteredArgs::new(values);
        assert_eq!(args.len(), 2);
        assert_eq!(args.get::<&str>(1), Some(&"two"));

        let err = args.take::<String>(0).unwrap_err();
        assert!(matches!(err, ContextError::ArgumentType { index: 0, .. }));
        assert_eq!(args.take::<i32>(0).unwrap(), 1);
        assert_eq!(args.take::<i32>(0).unwrap_err(), ContextError::MissingArgument(0));
        assert_eq!(args.take::<i32>(9).unwrap_err(), ContextError::MissingArgument(9));

        let rest = args.into_vec();
        assert!(rest[0].is_none());
        assert!(rest[1].is_some());
    }
}
