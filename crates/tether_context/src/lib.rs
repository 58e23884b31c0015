//! Scoped resources and the run-with executor for Tether (Layer 1).
//!
//! `tether_context` provides the protocol every other Tether layer builds on:
//!
//! - [`scope`] - The scoped-resource contract and the built-in resources
//! - [`value`] - Values accepted by the executor
//! - [`classify`] - Classifiers that turn values into scoped resources
//! - [`executor`] - Entering several resources around one callback
//! - [`error`] - Error types
//!
//! # Architecture
//!
//! - **Layer 1** (`tether_context`): scoped resources and classification (this crate)
//! - **Layer 2** (`tether_diagnostics`): diagnostic handlers as scoped resources
//!
//! # Example
//!
//! ```
//! use tether_context::classify::ClassClassifier;
//! use tether_context::executor::run_with;
//! use tether_context::scope::{ScopedResource, ValueWrapper};
//! use tether_context::value::Value;
//!
//! struct BaseDn(&'static str);
//!
//! let mut classifier = ClassClassifier::new()
//!     .with::<BaseDn, _, _>(|dn| ValueWrapper::new(dn.0.len()));
//! classifier.enter().unwrap();
//!
//! let len = run_with([Value::plain(BaseDn("dc=example,dc=org"))], |mut args| {
//!     Ok(args.take::<usize>(0)?)
//! })
//! .unwrap();
//! assert_eq!(len, Some(17));
//!
//! classifier.exit(None).unwrap();
//! ```

/// Scoped-resource contract, value wrapper and handle resources.
pub mod scope;

/// Values accepted by the executor.
pub mod value;

/// Classifiers, the classifier stack and the default classifier.
pub mod classify;

/// The run-with executor.
pub mod executor;

/// Error types.
pub mod error;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::classify::*;
    pub use crate::error::*;
    pub use crate::executor::*;
    pub use crate::scope::*;
    pub use crate::value::*;
}
