//! # Tether Internal Library
//!
//! Re-exports the Tether layer crates for convenience.

/// Layer 1: scoped resources, classifiers and the run-with executor.
pub use tether_context;

/// Layer 2: scoped diagnostic handlers.
pub use tether_diagnostics;

/// Logging setup.
pub use tether_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tether_context::prelude::*;
    pub use tether_core::prelude::*;
    pub use tether_diagnostics::prelude::*;
}
