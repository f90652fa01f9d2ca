//! Regimen distribution by weight band and gender.

use std::collections::BTreeMap;

use emr_model::{CountRow, Gender};
use serde::Deserialize;
use serde_json::Value;

use super::{as_count, regimen_columns};

/// Endpoint name under `programs/<id>/reports/`.
pub const REGIMENS_BY_WEIGHT_REPORT: &str = "regimens_by_weight_and_gender";

/// Regimen entries of one gender: each maps regimen codes to counts.
pub type RegimenEntries = Vec<BTreeMap<String, Value>>;

/// One weight band as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeightBand {
    pub weight: String,
    #[serde(default)]
    pub males: RegimenEntries,
    #[serde(default)]
    pub females: RegimenEntries,
}

/// Builds one row for a weight band and gender.
///
/// Each regimen column takes the value of the first entry that carries a
/// non-zero count for it.
pub fn weight_band_row(
    weight: &str,
    gender: Gender,
    entries: &[BTreeMap<String, Value>],
) -> CountRow {
    let values = regimen_columns()
        .map(|regimen| {
            let count = entries
                .iter()
                .filter_map(|entry| entry.get(regimen).map(as_count))
                .find(|count| *count > 0)
                .unwrap_or(0);
            (regimen.to_string(), count)
        })
        .collect();
    CountRow {
        label: weight.to_string(),
        gender: Some(gender),
        values,
    }
}

/// All female rows followed by all male rows, each in weight band order.
pub fn build_regimens_by_weight(bands: &[WeightBand]) -> Vec<CountRow> {
    let females = bands
        .iter()
        .map(|band| weight_band_row(&band.weight, Gender::Female, &band.females));
    let males = bands
        .iter()
        .map(|band| weight_band_row(&band.weight, Gender::Male, &band.males));
    females.chain(males).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_non_zero_entry_wins() {
        let bands: Vec<WeightBand> = serde_json::from_value(json!([
            {
                "weight": "3 - 3.9 Kg",
                "females": [{"0P": 0}, {"0P": 4}, {"0P": 9, "2P": 1}],
                "males": [{"4PP": 2}]
            },
            {
                "weight": "4 - 4.9 Kg",
                "females": [],
                "males": [{"N/A": 3}]
            }
        ]))
        .unwrap();
        let rows = build_regimens_by_weight(&bands);
        let labels: Vec<_> = rows.iter().map(|r| (r.label.as_str(), r.gender)).collect();
        assert_eq!(
            labels,
            [
                ("3 - 3.9 Kg", Some(Gender::Female)),
                ("4 - 4.9 Kg", Some(Gender::Female)),
                ("3 - 3.9 Kg", Some(Gender::Male)),
                ("4 - 4.9 Kg", Some(Gender::Male)),
            ]
        );
        assert_eq!(rows[0].get("0P"), 4);
        assert_eq!(rows[0].get("2P"), 1);
        assert_eq!(rows[0].total(), 5);
        assert_eq!(rows[1].total(), 0);
        assert_eq!(rows[3].get("N/A"), 3);
    }
}
