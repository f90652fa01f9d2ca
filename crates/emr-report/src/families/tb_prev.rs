//! TB prevention (TB_PREV) by TPT regimen.

use emr_model::{
    AggregatedReport, DisaggregatedResponse, FlatBucket, IndicatorBucket, RawIndicatorValue,
};

use crate::aggregate::aggregate_with;

pub const TB_PREV_REPORT: &str = "tb_prev2";

pub const TB_PREV_INDICATORS: [&str; 4] = [
    "started_new_on_art",
    "started_previously_on_art",
    "completed_new_on_art",
    "completed_previously_on_art",
];

/// TPT regimen buckets in the payload and the column prefix each one gets.
pub const TPT_REGIMENS: [(&str, &str); 2] = [("3HP", "3hp"), ("6H", "6h")];

/// Column names in display order: every indicator for 3HP and 6H.
pub fn tb_prev_columns() -> Vec<String> {
    TB_PREV_INDICATORS
        .iter()
        .flat_map(|indicator| {
            TPT_REGIMENS
                .iter()
                .map(move |(_, prefix)| format!("{prefix}_{indicator}"))
        })
        .collect()
}

/// Reads the `3HP` and `6H` sub-buckets of one age group and gender.
fn tb_prev_row(bucket: &IndicatorBucket) -> FlatBucket {
    let mut row = FlatBucket::default();
    for indicator in TB_PREV_INDICATORS {
        for (regimen, prefix) in TPT_REGIMENS {
            let value = bucket
                .get(regimen)
                .and_then(|value| value.get_path(&[indicator]))
                .unwrap_or(&RawIndicatorValue::Null);
            row.insert(format!("{prefix}_{indicator}"), value);
        }
    }
    row
}

pub fn build_tb_prev(response: &DisaggregatedResponse) -> AggregatedReport {
    let columns = tb_prev_columns();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    aggregate_with(response, &columns, tb_prev_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_model::PatientId;
    use serde_json::json;

    #[test]
    fn test_tb_prev_reads_regimen_buckets() {
        let response: DisaggregatedResponse = serde_json::from_value(json!({
            "25-29 years": {
                "F": {
                    "3HP": {"started_new_on_art": [{"patient_id": 7}, {"patient_id": 8}]},
                    "6H": {"completed_new_on_art": [9]}
                }
            },
            "30-34 years": {
                "F": {"3HP": {"started_new_on_art": [11]}}
            }
        }))
        .unwrap();
        let report = build_tb_prev(&response);
        let row = &report.female.rows[6];
        assert_eq!(row.age_group, "25-29 years");
        assert_eq!(row.count("3hp_started_new_on_art"), 2);
        assert_eq!(row.patients("6h_completed_new_on_art"), &[PatientId::new(9)]);
        assert_eq!(row.count("6h_started_new_on_art"), 0);
        assert_eq!(
            report.female.aggregate_of("3hp_started_new_on_art"),
            &[PatientId::new(7), PatientId::new(8), PatientId::new(11)]
        );
        assert_eq!(row.indicators.len(), 8);
    }
}
