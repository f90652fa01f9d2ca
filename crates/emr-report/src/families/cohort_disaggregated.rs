//! Disaggregated cohort: the cohort's patients by age group and gender.
//!
//! The EMR builds the disaggregation into a temporary table first. A request
//! with `initialize=true` answers `{"temp_disaggregated": "created"}` once
//! that table exists; the data itself comes from a second request.

use emr_client::QueryParams;
use emr_model::{AGE_GROUPS, AggregatedReport, DisaggregatedResponse, Gender};
use serde::Deserialize;
use serde_json::Value;

use crate::aggregate::aggregate_disaggregated;

pub const COHORT_DISAGGREGATED_REPORT: &str = "cohort_disaggregated";
pub const CLIENTS_GIVEN_IPT_REPORT: &str = "clients_given_ipt";
pub const SCREENED_FOR_TB_REPORT: &str = "screened_for_tb";
pub const REGIMEN_DISTRIBUTION_REPORT: &str = "disaggregated_regimen_distribution";

/// Key of the initialization marker in the cohort payload.
pub const INITIALIZED_KEY: &str = "temp_disaggregated";
const INITIALIZED_VALUE: &str = "created";

pub const COHORT_DISAGGREGATED_INDICATORS: [(&str, &str); 4] = [
    ("tx_new", "TX_NEW"),
    ("tx_curr", "TX_CURR"),
    ("tx_screened_for_tb", "TX_CURR screened for TB"),
    ("tx_given_ipt", "TX_CURR given IPT"),
];

pub fn cohort_disaggregated_indicators() -> Vec<&'static str> {
    COHORT_DISAGGREGATED_INDICATORS
        .iter()
        .map(|(name, _)| *name)
        .collect()
}

/// Quarter, age group and rebuild flag of a disaggregated cohort request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortDisaggregation {
    pub quarter: String,
    pub age_group: String,
    pub rebuild_outcome: bool,
}

impl CohortDisaggregation {
    /// Request for the first age group with outcomes rebuilt.
    pub fn new(quarter: impl Into<String>) -> Self {
        Self {
            quarter: quarter.into(),
            age_group: AGE_GROUPS[0].to_string(),
            rebuild_outcome: true,
        }
    }

    #[must_use]
    pub fn with_age_group(mut self, age_group: impl Into<String>) -> Self {
        self.age_group = age_group.into();
        self
    }

    #[must_use]
    pub fn with_rebuild_outcome(mut self, rebuild_outcome: bool) -> Self {
        self.rebuild_outcome = rebuild_outcome;
        self
    }

    pub fn params(&self, initialize: bool) -> QueryParams {
        QueryParams::new()
            .with("age_group", self.age_group.as_str())
            .with("rebuild_outcome", self.rebuild_outcome)
            .with("initialize", initialize)
            .with("quarter", self.quarter.as_str())
    }

    /// Parameters of the per-gender sibling reports (IPT, TB screening,
    /// regimen distribution).
    pub fn gender_params(&self, gender: Gender) -> QueryParams {
        QueryParams::new()
            .with("gender", gender.as_code())
            .with("age_group", self.age_group.as_str())
    }
}

/// Whether an initialization response reports the table as created.
pub fn is_initialized(payload: &Value) -> bool {
    payload.get(INITIALIZED_KEY).and_then(Value::as_str) == Some(INITIALIZED_VALUE)
}

/// Deserializes a cohort payload, ignoring the initialization marker.
pub(crate) fn cohort_response(
    payload: &Value,
) -> std::result::Result<DisaggregatedResponse, serde_json::Error> {
    match payload {
        Value::Null => Ok(DisaggregatedResponse::new()),
        Value::Object(object) if object.contains_key(INITIALIZED_KEY) => {
            let mut object = object.clone();
            object.remove(INITIALIZED_KEY);
            DisaggregatedResponse::deserialize(Value::Object(object))
        }
        other => DisaggregatedResponse::deserialize(other),
    }
}

pub fn build_cohort_disaggregated(response: &DisaggregatedResponse) -> AggregatedReport {
    aggregate_disaggregated(response, &cohort_disaggregated_indicators())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_model::PatientId;
    use serde_json::json;

    #[test]
    fn test_params_order() {
        let request = CohortDisaggregation::new("Q1 2024").with_age_group("15-19 years");
        assert_eq!(
            request.params(true).to_string(),
            "age_group=15-19 years&rebuild_outcome=true&initialize=true&quarter=Q1 2024"
        );
        assert_eq!(
            request.gender_params(Gender::Female).to_string(),
            "gender=F&age_group=15-19 years"
        );
    }

    #[test]
    fn test_initialization_marker() {
        assert!(is_initialized(&json!({"temp_disaggregated": "created"})));
        assert!(!is_initialized(&json!({"temp_disaggregated": "pending"})));
        assert!(!is_initialized(&Value::Null));
    }

    #[test]
    fn test_marker_is_not_an_age_group() {
        let payload = json!({
            "temp_disaggregated": "created",
            "<1 year": {"F": {"tx_new": [3], "tx_curr": [3, 4]}}
        });
        let response = cohort_response(&payload).unwrap();
        let report = build_cohort_disaggregated(&response);
        assert_eq!(
            report.female.aggregate_of("tx_curr"),
            &[PatientId::new(3), PatientId::new(4)]
        );
        assert!(report.male.aggregate_of("tx_given_ipt").is_empty());
        assert_eq!(report.female.rows[0].indicators.len(), 4);
    }
}
