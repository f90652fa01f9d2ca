//! Gender and age-group aggregation of disaggregated report payloads.
//!
//! Every disaggregated family shares the same shape: age group, then gender,
//! then indicator. Aggregation walks the canonical age groups in order for
//! each gender, builds one row per age group and concatenates each row's
//! patients into the all-ages roll-up of that indicator. Indicators reported
//! as bare counts are summed into the roll-up instead.

use emr_model::age_group::is_canonical;
use emr_model::{
    AGE_GROUPS, AggregatedReport, DisaggregatedResponse, FlatBucket, Gender, IndicatorBucket,
    ReportRow, flatten_bucket,
};

/// Aggregates a payload whose indicators need no reshaping beyond
/// routine/targeted flattening.
///
/// Every name in `indicators` is present in every row and in the roll-up,
/// empty when the payload has nothing for it.
pub fn aggregate_disaggregated(
    response: &DisaggregatedResponse,
    indicators: &[&str],
) -> AggregatedReport {
    aggregate_with(response, indicators, flatten_bucket)
}

/// Aggregates a payload, shaping each (age group, gender) bucket with
/// `build_row`.
///
/// Age-group keys outside the canonical list are dropped. A bucket missing
/// from the payload is built from an empty bucket, so paths that do not
/// resolve end up as empty lists rather than errors.
pub fn aggregate_with<F>(
    response: &DisaggregatedResponse,
    indicators: &[&str],
    build_row: F,
) -> AggregatedReport
where
    F: Fn(&IndicatorBucket) -> FlatBucket,
{
    for key in response.keys().filter(|key| !is_canonical(key)) {
        tracing::warn!("Dropping non-canonical age group bucket '{}'", key);
    }

    let empty = IndicatorBucket::new();
    let mut report = AggregatedReport::default();
    for gender in Gender::ALL {
        let gender_report = report.gender_mut(gender);
        for age_group in AGE_GROUPS {
            let bucket = response
                .get(age_group)
                .and_then(|genders| genders.get(gender.as_code()))
                .unwrap_or(&empty);

            let flat = build_row(bucket);
            let mut row = ReportRow::new(gender, age_group);
            row.indicators = flat.patients;
            row.counts = flat.counts;
            for indicator in indicators {
                row.indicators.entry((*indicator).to_string()).or_default();
            }
            for (indicator, patients) in &row.indicators {
                gender_report
                    .aggregate
                    .entry(indicator.clone())
                    .or_default()
                    .extend(patients.iter().copied());
            }
            for (indicator, count) in &row.counts {
                let total = gender_report.counts.entry(indicator.clone()).or_default();
                *total = total.saturating_add(*count);
            }
            gender_report.rows.push(row);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_model::PatientId;

    fn payload(json: &str) -> DisaggregatedResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_rollup_follows_age_order() {
        let response = payload(
            r#"{
                "1-4 years": {"M": {"ind": [20]}},
                "<1 year": {"M": {"ind": [10]}}
            }"#,
        );
        let report = aggregate_disaggregated(&response, &["ind"]);
        assert_eq!(
            report.male.aggregate_of("ind"),
            &[PatientId::new(10), PatientId::new(20)]
        );
        assert_eq!(report.male.rows.len(), AGE_GROUPS.len());
        assert_eq!(report.female.aggregate_of("ind"), &[] as &[PatientId]);
    }

    #[test]
    fn test_unknown_bucket_is_dropped() {
        let response = payload(
            r#"{
                "Unknown": {"F": {"ind": [1, 2, 3]}},
                "20-24 years": {"F": {"ind": [4]}}
            }"#,
        );
        let report = aggregate_disaggregated(&response, &["ind"]);
        assert_eq!(report.female.aggregate_of("ind"), &[PatientId::new(4)]);
        assert!(report.rows().all(|row| row.age_group != "Unknown"));
    }

    #[test]
    fn test_count_leaves_are_summed() {
        let response = payload(
            r#"{
                "20-24 years": {"M": {"tx_curr": 5, "cxr_screen": [1, 2]}},
                "25-29 years": {"M": {"tx_curr": 2}}
            }"#,
        );
        let report = aggregate_disaggregated(&response, &["tx_curr", "cxr_screen"]);
        let row = &report.male.rows[5];
        assert_eq!(row.age_group, "20-24 years");
        assert_eq!(row.count("tx_curr"), 5);
        assert_eq!(row.count("cxr_screen"), 2);
        assert_eq!(report.male.counts["tx_curr"], 7);
        assert_eq!(report.male.total("tx_curr"), 7);
        assert_eq!(report.male.total("cxr_screen"), 2);
        assert!(report.female.counts.is_empty());
    }

    #[test]
    fn test_declared_indicators_always_present() {
        let report = aggregate_disaggregated(&DisaggregatedResponse::new(), &["tx_curr"]);
        assert!(report.rows().all(|row| row.indicators.contains_key("tx_curr")));
        assert!(report.male.aggregate.contains_key("tx_curr"));
    }
}
