//! Results of the remote report validation service.
//!
//! The service answers with one entry per failed rule. Its messages name
//! fields directly (`cum_total_registered ...`); [`to_error_strings`] turns
//! them into the short display form used alongside local validation errors.

use serde::{Deserialize, Serialize};

/// One failed rule as returned by the validation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VBoxResult {
    pub table: VBoxResultTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VBoxResultTable {
    pub rule: VBoxResultRule,
    pub base_value: f64,
    pub operands_value: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VBoxResultRule {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    pub report_id: u64,
    pub operator_id: u64,
    #[serde(default)]
    pub description: Option<String>,
    pub comparator_id: u64,
}

/// Display form of a service message: the first `cum_` becomes
/// `Cumulative` and then the first remaining underscore becomes a space.
pub fn display_message(message: &str) -> String {
    message.replacen("cum_", "Cumulative", 1).replacen('_', " ", 1)
}

pub fn to_error_strings(results: &[VBoxResult]) -> Vec<String> {
    results
        .iter()
        .map(|result| display_message(&result.table.message))
        .collect()
}
