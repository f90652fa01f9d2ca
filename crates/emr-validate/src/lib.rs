//! Cohort report validation.
//!
//! - [`rules`]: the static MoH cohort rule set and section-rule builders
//! - [`engine`]: evaluation of a rule set against a flat cohort record
//! - [`vbox`]: display conversion for the remote validation service

pub mod engine;
pub mod error;
pub mod rules;
pub mod vbox;

pub use engine::{
    CohortReport, RuleEngine, RuleViolation, find_violations, validate, validate_cohort,
};
pub use error::{Result, ValidationError};
pub use rules::{ValidationRule, cohort_rules, section_rules};
pub use vbox::{VBoxResult, to_error_strings};
