use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CountSet, Gender, GenderGroup, IndicatorSet, PatientId};

/// One disaggregated row: the indicators of a single (age group, gender).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub gender: GenderGroup,
    #[serde(rename = "ageGroup")]
    pub age_group: String,
    /// Indicators the payload reported as a bare number.
    #[serde(default, skip_serializing_if = "CountSet::is_empty")]
    pub counts: CountSet,
    #[serde(flatten)]
    pub indicators: IndicatorSet,
}

impl ReportRow {
    pub fn new(gender: impl Into<GenderGroup>, age_group: impl Into<String>) -> Self {
        Self {
            gender: gender.into(),
            age_group: age_group.into(),
            counts: CountSet::new(),
            indicators: IndicatorSet::new(),
        }
    }

    /// Patients under `indicator`, empty when the row does not carry it.
    pub fn patients(&self, indicator: &str) -> &[PatientId] {
        self.indicators
            .get(indicator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Patients listed under `indicator` plus any bare count reported for it.
    pub fn count(&self, indicator: &str) -> u64 {
        total(self.patients(indicator), &self.counts, indicator)
    }
}

/// Rows for one gender plus the all-ages roll-up of every indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderReport {
    pub rows: Vec<ReportRow>,
    pub aggregate: IndicatorSet,
    /// Sum of the bare counts of every row.
    #[serde(default, skip_serializing_if = "CountSet::is_empty")]
    pub counts: CountSet,
}

impl GenderReport {
    /// All-ages patients under `indicator`.
    pub fn aggregate_of(&self, indicator: &str) -> &[PatientId] {
        self.aggregate
            .get(indicator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All-ages total of `indicator`, counting patients and bare counts.
    pub fn total(&self, indicator: &str) -> u64 {
        total(self.aggregate_of(indicator), &self.counts, indicator)
    }
}

fn total(patients: &[PatientId], counts: &CountSet, indicator: &str) -> u64 {
    let listed = u64::try_from(patients.len()).unwrap_or(u64::MAX);
    listed.saturating_add(counts.get(indicator).copied().unwrap_or(0))
}

/// A disaggregated report split by gender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedReport {
    #[serde(rename = "M")]
    pub male: GenderReport,
    #[serde(rename = "F")]
    pub female: GenderReport,
}

impl AggregatedReport {
    pub fn gender(&self, gender: Gender) -> &GenderReport {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }

    pub fn gender_mut(&mut self, gender: Gender) -> &mut GenderReport {
        match gender {
            Gender::Male => &mut self.male,
            Gender::Female => &mut self.female,
        }
    }

    /// Every row, males first.
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.male.rows.iter().chain(self.female.rows.iter())
    }
}

/// A count-valued row keyed by an arbitrary label (age group, weight band).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub values: BTreeMap<String, u64>,
}

impl CountRow {
    pub fn get(&self, column: &str) -> u64 {
        self.values.get(column).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.values
            .values()
            .fold(0u64, |sum, value| sum.saturating_add(*value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_adds_bare_counts_to_patients() {
        let mut row = ReportRow::new(Gender::Male, "20-24 years");
        row.indicators
            .insert("tx_curr".to_string(), vec![PatientId::new(1)]);
        row.counts.insert("tx_curr".to_string(), 5);
        assert_eq!(row.count("tx_curr"), 6);
        assert_eq!(row.count("cxr_screen"), 0);

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["counts"]["tx_curr"], 5);
        let round: ReportRow = serde_json::from_value(json).unwrap();
        assert_eq!(round, row);
    }

    #[test]
    fn count_row_total_saturates() {
        let row = CountRow {
            label: "25 - 29.9 Kg".to_string(),
            gender: None,
            values: BTreeMap::from([("4A".to_string(), u64::MAX), ("13A".to_string(), 2)]),
        };
        assert_eq!(row.total(), u64::MAX);
    }
}
