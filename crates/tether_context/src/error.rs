//! Error types for the scoped-resource protocol.

use thiserror::Error;

/// Error currency of the scoped-resource protocol.
///
/// Pending errors handed to [`ScopedResource::exit`](crate::scope::ScopedResource::exit),
/// errors raised by `enter`/`exit`, and errors returned by executor callbacks
/// are all boxed into this type. Consumers recover concrete errors with
/// [`downcast_ref`](https://doc.rust-lang.org/std/error/trait.Error.html#method.downcast_ref).
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors produced by the context framework itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A single-use resource was entered a second time.
    #[error("resource already entered: {0}")]
    AlreadyEntered(&'static str),

    /// A propagating error was suppressed, so no callback value exists.
    #[error("error was suppressed before the callback produced a value")]
    Suppressed,

    /// No entered value exists at the requested position, or it was already taken.
    #[error("no entered value at position {0}")]
    MissingArgument(usize),

    /// The entered value at the requested position has a different type.
    #[error("entered value at position {index} is not a {expected}")]
    ArgumentType {
        /// Position of the argument.
        index: usize,
        /// Type name that was requested.
        expected: &'static str,
    },
}
