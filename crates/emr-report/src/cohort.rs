//! The quarterly cohort report checked by the cohort rules.
//!
//! A cohort is requested either for a named quarter or for an explicit
//! period, which the EMR names `Cohort-<start>-<end>`. The response lists
//! each indicator with its contents; [`cohort_data`] reduces it to the flat
//! indicator counts the validator reads.

use chrono::NaiveDate;
use emr_client::QueryParams;
use emr_model::CohortData;
use serde_json::{Map, Value};

use crate::dates;
use crate::error::{ReportError, Result};
use crate::query::ReportContext;

pub const COHORT_REPORT: &str = "cohort";
pub const COHORT_DRILL_DOWN_PATH: &str = "cohort_report_drill_down";

/// Period a cohort report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CohortPeriod {
    /// A reporting quarter such as `Q1 2024`.
    Quarter(String),
    Dates { start: NaiveDate, end: NaiveDate },
}

/// A cohort report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortRequest {
    pub period: CohortPeriod,
    /// Ask the EMR to rebuild the report instead of serving a saved one.
    pub regenerate: bool,
}

impl CohortRequest {
    pub fn quarter(quarter: impl Into<String>) -> Self {
        Self {
            period: CohortPeriod::Quarter(quarter.into()),
            regenerate: false,
        }
    }

    pub fn dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period: CohortPeriod::Dates { start, end },
            regenerate: false,
        }
    }

    #[must_use]
    pub fn with_regenerate(mut self, regenerate: bool) -> Self {
        self.regenerate = regenerate;
        self
    }

    /// Report name the EMR files the cohort under.
    pub fn name(&self) -> String {
        match &self.period {
            CohortPeriod::Quarter(quarter) => quarter.clone(),
            CohortPeriod::Dates { start, end } => format!(
                "Cohort-{}-{}",
                dates::to_standard_fmt(*start),
                dates::to_standard_fmt(*end)
            ),
        }
    }

    pub fn params(&self, context: &ReportContext) -> QueryParams {
        match &self.period {
            CohortPeriod::Quarter(_) => QueryParams::new()
                .with("name", self.name())
                .with("location", context.location())
                .with("regenerate", self.regenerate),
            CohortPeriod::Dates { start, end } => QueryParams::new()
                .with("name", self.name())
                .with("start_date", dates::to_standard_fmt(*start))
                .with("end_date", dates::to_standard_fmt(*end))
                .with("regenerate", self.regenerate)
                .with("location", context.location()),
        }
    }
}

/// Reduces a cohort report payload to indicator counts.
///
/// Accepts the EMR's `{"values": [{"name", "contents"}, ...]}` envelope, a
/// bare list of such entries, or an object of indicator counts. Contents may
/// be a number, a numeric string or a list of patients (its length). `null`
/// contents count as 0.
pub fn cohort_data(payload: &Value) -> Result<CohortData> {
    match payload {
        Value::Null => Ok(CohortData::new()),
        Value::Array(entries) => entries.iter().map(named_count).collect(),
        Value::Object(object) => match object.get("values") {
            Some(Value::Array(entries)) => entries.iter().map(named_count).collect(),
            _ => object
                .iter()
                .map(|(name, contents)| Ok((name.clone(), contents_count(name, contents)?)))
                .collect(),
        },
        other => Err(decode(format!("expected a list of indicators, got {other}"))),
    }
}

fn named_count(entry: &Value) -> Result<(String, i64)> {
    let entry: &Map<String, Value> = entry
        .as_object()
        .ok_or_else(|| decode(format!("expected an indicator entry, got {entry}")))?;
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| decode("indicator entry without a name".to_string()))?;
    let contents = entry.get("contents").unwrap_or(&Value::Null);
    Ok((name.to_string(), contents_count(name, contents)?))
}

fn contents_count(name: &str, contents: &Value) -> Result<i64> {
    match contents {
        Value::Null => Ok(0),
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| decode(format!("'{name}' is not a whole count: {number}"))),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| decode(format!("'{name}' is not a count: {text:?}"))),
        Value::Array(patients) => Ok(i64::try_from(patients.len()).unwrap_or(i64::MAX)),
        Value::Bool(_) | Value::Object(_) => {
            Err(decode(format!("'{name}' has no count: {contents}")))
        }
    }
}

fn decode(message: String) -> ReportError {
    ReportError::Decode {
        report: COHORT_REPORT.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_quarter_params() {
        let request = CohortRequest::quarter("Q1 2024");
        assert_eq!(
            request.params(&ReportContext::for_facility(706)).to_string(),
            "name=Q1 2024&location=706&regenerate=false"
        );
    }

    #[test]
    fn test_period_params() {
        let request =
            CohortRequest::dates(date(2024, 1, 1), date(2024, 3, 31)).with_regenerate(true);
        assert_eq!(request.name(), "Cohort-2024-01-01-2024-03-31");
        assert_eq!(
            request.params(&ReportContext::for_facility(706)).to_string(),
            "name=Cohort-2024-01-01-2024-03-31&start_date=2024-01-01&end_date=2024-03-31\
             &regenerate=true&location=706"
        );
    }

    #[test]
    fn test_values_envelope() {
        let data = cohort_data(&json!({
            "name": "Q1 2024",
            "values": [
                {"name": "total_registered", "contents": 12},
                {"name": "transfer_in", "contents": [1, 2, 3]},
                {"name": "re_initiated_on_art", "contents": "4"},
                {"name": "unknown_gender", "contents": null}
            ]
        }))
        .unwrap();
        assert_eq!(data.get("total_registered"), Some(12));
        assert_eq!(data.get("transfer_in"), Some(3));
        assert_eq!(data.get("re_initiated_on_art"), Some(4));
        assert_eq!(data.get("unknown_gender"), Some(0));
    }

    #[test]
    fn test_flat_counts_and_errors() {
        let data = cohort_data(&json!({"total_registered": 5})).unwrap();
        assert_eq!(data.get("total_registered"), Some(5));

        let err = cohort_data(&json!([{"contents": 1}])).unwrap_err();
        assert!(matches!(err, ReportError::Decode { .. }));
        let err = cohort_data(&json!({"total_registered": {"M": 1}})).unwrap_err();
        assert!(matches!(err, ReportError::Decode { .. }));
    }
}
