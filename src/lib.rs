//! Composable scoped resources with guaranteed release, and scoped
//! diagnostic handlers built on top of them.
//!
//! ```
//! use tether::prelude::*;
//!
//! let value = run_with([Value::plain(20_i32)], |mut args| {
//!     let n: i32 = args.take(0)?;
//!     Ok(n + 1)
//! });
//! assert_eq!(value.unwrap(), Some(21));
//! ```

pub use tether_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tether_internal::prelude::*;
}
