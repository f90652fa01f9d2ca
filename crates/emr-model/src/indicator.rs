//! Indicator values as delivered by the report API and their normalized form.
//!
//! A leaf in a disaggregated report is not uniformly typed: it may be a list
//! of patients, a bare count, a `{routine, targeted}` pair of patient lists,
//! or a further level of named buckets (TB prevention nests by regimen).
//! [`RawIndicatorValue`] captures that union at the deserialization boundary;
//! [`flatten_bucket`] turns a bucket of raw values into the [`FlatBucket`]
//! the aggregators work on: patient lists plus any bare counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PatientId;

/// Indicator name mapped to the patients counted under it.
pub type IndicatorSet = BTreeMap<String, Vec<PatientId>>;

/// Indicator name mapped to a count reported in place of patients.
pub type CountSet = BTreeMap<String, u64>;

/// Indicators reported for one gender within one age group.
pub type IndicatorBucket = BTreeMap<String, RawIndicatorValue>;

/// Gender code (`M`, `F`, ...) mapped to its indicators.
pub type GenderBuckets = BTreeMap<String, IndicatorBucket>;

/// A disaggregated report payload: age group, then gender, then indicator.
pub type DisaggregatedResponse = BTreeMap<String, GenderBuckets>;

/// Suffix appended to the routine half of a split indicator.
pub const ROUTINE_SUFFIX: &str = "routine";
/// Suffix appended to the targeted half of a split indicator.
pub const TARGETED_SUFFIX: &str = "targeted";

/// Patients split by the reason a sample was drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutineTargeted {
    pub routine: Vec<PatientId>,
    pub targeted: Vec<PatientId>,
}

/// A leaf value of a report payload, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawIndicatorValue {
    Patients(Vec<PatientId>),
    Count(u64),
    Split(RoutineTargeted),
    Nested(BTreeMap<String, RawIndicatorValue>),
    Null,
}

impl RawIndicatorValue {
    /// Follows `path` through nested buckets.
    pub fn get_path(&self, path: &[&str]) -> Option<&RawIndicatorValue> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            RawIndicatorValue::Nested(children) => children.get(*head)?.get_path(rest),
            _ => None,
        }
    }

    /// Patients held directly by this value; anything else is empty.
    pub fn patients(&self) -> &[PatientId] {
        match self {
            RawIndicatorValue::Patients(ids) => ids,
            _ => &[],
        }
    }

    /// Numeric value of a count leaf, or the size of a patient list.
    pub fn count(&self) -> u64 {
        match self {
            RawIndicatorValue::Count(value) => *value,
            RawIndicatorValue::Patients(ids) => ids.len() as u64,
            RawIndicatorValue::Split(split) => (split.routine.len() + split.targeted.len()) as u64,
            RawIndicatorValue::Nested(_) | RawIndicatorValue::Null => 0,
        }
    }
}

/// A bucket after normalization.
///
/// Leaves delivered as patient lists land in `patients`; leaves delivered as
/// a bare number land in `counts` under the same flattened name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatBucket {
    pub patients: IndicatorSet,
    pub counts: CountSet,
}

impl FlatBucket {
    /// Records `value` under `name`, routing it by leaf kind.
    pub fn insert(&mut self, name: String, value: &RawIndicatorValue) {
        match value {
            RawIndicatorValue::Count(count) => {
                self.counts.insert(name, *count);
            }
            other => {
                self.patients.insert(name, other.patients().to_vec());
            }
        }
    }
}

/// Normalizes a bucket of raw values into one [`FlatBucket`].
///
/// Patient lists keep their name, `{routine, targeted}` pairs become the two
/// sibling indicators `<name>_routine` and `<name>_targeted`, and nested
/// buckets are flattened the same way with `<name>_<child>` keys. `null`
/// normalizes to an empty list and count leaves keep their number.
pub fn flatten_bucket(bucket: &IndicatorBucket) -> FlatBucket {
    let mut out = FlatBucket::default();
    for (name, value) in bucket {
        flatten_into(&mut out, name, value);
    }
    out
}

/// The patient lists of [`flatten_bucket`].
pub fn flatten_indicators(bucket: &IndicatorBucket) -> IndicatorSet {
    flatten_bucket(bucket).patients
}

fn flatten_into(out: &mut FlatBucket, name: &str, value: &RawIndicatorValue) {
    match value {
        RawIndicatorValue::Split(split) => {
            out.patients
                .insert(format!("{name}_{ROUTINE_SUFFIX}"), split.routine.clone());
            out.patients
                .insert(format!("{name}_{TARGETED_SUFFIX}"), split.targeted.clone());
        }
        RawIndicatorValue::Nested(children) => {
            for (child, nested) in children {
                flatten_into(out, &format!("{name}_{child}"), nested);
            }
        }
        leaf => out.insert(name.to_string(), leaf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u64]) -> Vec<PatientId> {
        values.iter().copied().map(PatientId::new).collect()
    }

    #[test]
    fn routine_and_targeted_become_siblings() {
        let bucket: IndicatorBucket = serde_json::from_str(
            r#"{"due_for_vl": [1, 2], "drawn": {"routine": [1], "targeted": [2]}}"#,
        )
        .unwrap();
        let flat = flatten_indicators(&bucket);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat["due_for_vl"], ids(&[1, 2]));
        assert_eq!(flat["drawn_routine"], ids(&[1]));
        assert_eq!(flat["drawn_targeted"], ids(&[2]));
    }

    #[test]
    fn nested_buckets_are_reachable_by_path() {
        let value: RawIndicatorValue =
            serde_json::from_str(r#"{"3HP": {"started_new_on_art": [5, 6]}, "6H": {}}"#).unwrap();
        let leaf = value.get_path(&["3HP", "started_new_on_art"]).unwrap();
        assert_eq!(leaf.patients(), ids(&[5, 6]).as_slice());
        assert!(value.get_path(&["6H", "started_new_on_art"]).is_none());
        assert!(value.get_path(&["1HP"]).is_none());
    }

    #[test]
    fn counts_and_nulls() {
        let bucket: IndicatorBucket =
            serde_json::from_str(r#"{"tx_curr": 4, "missing": null}"#).unwrap();
        assert_eq!(bucket["tx_curr"].count(), 4);
        let flat = flatten_bucket(&bucket);
        assert!(!flat.patients.contains_key("tx_curr"));
        assert_eq!(flat.counts["tx_curr"], 4);
        assert_eq!(flat.patients["missing"], Vec::<PatientId>::new());
    }

    #[test]
    fn nested_counts_keep_flattened_names() {
        let bucket: IndicatorBucket =
            serde_json::from_str(r#"{"3HP": {"started_new_on_art": 3}}"#).unwrap();
        let flat = flatten_bucket(&bucket);
        assert_eq!(flat.counts["3HP_started_new_on_art"], 3);
        assert!(flat.patients.is_empty());
    }

    #[test]
    fn partial_split_is_treated_as_nested() {
        let bucket: IndicatorBucket =
            serde_json::from_str(r#"{"drawn": {"routine": [9]}}"#).unwrap();
        let flat = flatten_indicators(&bucket);
        assert_eq!(flat["drawn_routine"], ids(&[9]));
        assert!(!flat.contains_key("drawn_targeted"));
    }
}
