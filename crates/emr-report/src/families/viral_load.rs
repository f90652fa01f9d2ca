//! Viral load coverage (TX_PVLS) and viral load by regimen.

use emr_model::age_group::spaced_label;
use emr_model::{AGE_GROUPS, AggregatedReport, CountRow, DisaggregatedResponse};
use serde_json::Value;

use super::{count_at, regimen_columns};
use crate::aggregate::aggregate_disaggregated;

pub const TX_PVLS_REPORT: &str = "viral_load_coverage";
pub const VL_BY_REGIMEN_REPORT: &str = "vl_disaggregated";

/// TX_PVLS indicators after routine/targeted flattening, with their labels.
pub const TX_PVLS_INDICATORS: [(&str, &str); 8] = [
    ("tx_curr", "TX_CURR"),
    ("due_for_vl", "Due for VL"),
    ("drawn_routine", "Routine (Sample Drawn)"),
    ("drawn_targeted", "Targeted (Sample Drawn)"),
    ("high_vl_routine", "Routine (High VL (>=1000 copies))"),
    ("high_vl_targeted", "Targeted (High VL (>=1000 copies))"),
    ("low_vl_routine", "Routine (Low VL (<1000 copies))"),
    ("low_vl_targeted", "Targeted (Low VL (<1000 copies))"),
];

pub fn tx_pvls_indicators() -> Vec<&'static str> {
    TX_PVLS_INDICATORS.iter().map(|(name, _)| *name).collect()
}

pub fn build_tx_pvls(response: &DisaggregatedResponse) -> AggregatedReport {
    aggregate_disaggregated(response, &tx_pvls_indicators())
}

/// One count row per canonical age group with a column per regimen.
///
/// The endpoint keys age groups with a widened dash (`1 - 4 years`).
pub fn build_vl_by_regimen(data: &Value) -> Vec<CountRow> {
    AGE_GROUPS
        .iter()
        .map(|age_group| {
            let key = spaced_label(age_group);
            CountRow {
                label: (*age_group).to_string(),
                gender: None,
                values: regimen_columns()
                    .map(|regimen| (regimen.to_string(), count_at(data, &[&key, regimen])))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_model::PatientId;
    use serde_json::json;

    #[test]
    fn test_tx_pvls_flattens_splits() {
        let response: DisaggregatedResponse = serde_json::from_value(json!({
            "15-19 years": {
                "F": {
                    "tx_curr": [1, 2],
                    "due_for_vl": [1, 2],
                    "drawn": {"routine": [1], "targeted": [2]},
                    "high_vl": {"routine": [], "targeted": [2]},
                    "low_vl": {"routine": [1], "targeted": []}
                }
            }
        }))
        .unwrap();
        let report = build_tx_pvls(&response);
        let row = &report.female.rows[4];
        assert_eq!(row.age_group, "15-19 years");
        assert_eq!(row.patients("drawn_targeted"), &[PatientId::new(2)]);
        assert_eq!(row.indicators.len(), TX_PVLS_INDICATORS.len());
        assert_eq!(report.female.aggregate_of("low_vl_routine"), &[PatientId::new(1)]);
    }

    #[test]
    fn test_vl_by_regimen_reads_spaced_keys() {
        let data = json!({
            "1 - 4 years": {"4A": 2, "N/A": 1},
            "90 plus years": {"13A": 5}
        });
        let rows = build_vl_by_regimen(&data);
        assert_eq!(rows.len(), AGE_GROUPS.len());
        assert_eq!(rows[1].label, "1-4 years");
        assert_eq!(rows[1].get("4A"), 2);
        assert_eq!(rows[1].get("N/A"), 1);
        assert_eq!(rows[1].get("5A"), 0);
        assert_eq!(rows[19].get("13A"), 5);
        assert_eq!(rows[0].total(), 0);
    }
}
