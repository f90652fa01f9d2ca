//! Error types for cohort validation.

use thiserror::Error;

/// Errors raised while building or evaluating validation rules.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// A rule was declared without any indicators to sum.
    #[error("validation rule for `{comparator}` has no indicators")]
    EmptyIndicators {
        /// Comparator field of the offending rule.
        comparator: String,
    },

    /// The cohort record lacks a field a rule refers to.
    ///
    /// Missing fields are never treated as zero: they point at a broken
    /// upstream report and must be fixed there.
    #[error("cohort data is missing `{field}` required by rule {rule}")]
    MissingField {
        /// Index of the rule in declaration order.
        rule: usize,
        /// The absent field.
        field: String,
    },

    /// Summing the indicators of a rule overflowed.
    #[error("sum of indicators for rule {rule} overflowed")]
    Overflow {
        /// Index of the rule in declaration order.
        rule: usize,
    },
}

/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
