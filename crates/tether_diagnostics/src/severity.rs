//! Diagnostic severity categories.

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// A set of diagnostic categories.
    ///
    /// A [`Diagnostic`](crate::diagnostic::Diagnostic) carries exactly one
    /// category; policies and installed handlers carry a mask, which is any
    /// union of categories.
    ///
    /// ```
    /// use tether_diagnostics::severity::Severity;
    ///
    /// let mask = Severity::WARNING | Severity::USER_WARNING;
    /// assert!(mask.intersects(Severity::WARNING));
    /// assert!(!mask.intersects(Severity::NOTICE));
    /// assert!(Severity::all().contains(mask));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Severity: u32 {
        /// Fatal run-time error reported by the environment.
        const ERROR = 1;
        /// Non-fatal run-time warning.
        const WARNING = 1 << 1;
        /// Run-time notice; something that could indicate an error.
        const NOTICE = 1 << 3;
        /// Error raised by user code.
        const USER_ERROR = 1 << 8;
        /// Warning raised by user code.
        const USER_WARNING = 1 << 9;
        /// Notice raised by user code.
        const USER_NOTICE = 1 << 10;
        /// Suggestion about forward compatibility.
        const STRICT = 1 << 11;
        /// Error the environment can continue after.
        const RECOVERABLE_ERROR = 1 << 12;
        /// Use of a feature that will be removed.
        const DEPRECATED = 1 << 13;
        /// Deprecation raised by user code.
        const USER_DEPRECATED = 1 << 14;
    }
}

impl Severity {
    /// Every error-class category.
    pub const ERRORS: Self = Self::ERROR
        .union(Self::USER_ERROR)
        .union(Self::RECOVERABLE_ERROR);

    /// Every warning-class category.
    pub const WARNINGS: Self = Self::WARNING.union(Self::USER_WARNING);

    /// Every notice-class category.
    pub const NOTICES: Self = Self::NOTICE.union(Self::USER_NOTICE);

    /// Every deprecation-class category, including strict-mode suggestions.
    pub const DEPRECATIONS: Self = Self::DEPRECATED
        .union(Self::USER_DEPRECATED)
        .union(Self::STRICT);

    /// Returns the `tracing` level used when no handler claims a diagnostic.
    ///
    /// For masks spanning several classes, the most severe class wins.
    #[must_use]
    pub fn level(self) -> tracing::Level {
        if self.intersects(Self::ERRORS) {
            tracing::Level::ERROR
        } else if self.intersects(Self::WARNINGS) {
            tracing::Level::WARN
        } else if self.intersects(Self::NOTICES) {
            tracing::Level::INFO
        } else {
            tracing::Level::DEBUG
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}
