use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat cohort report: indicator name mapped to its count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CohortData(BTreeMap<String, i64>);

impl CohortData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, indicator: &str) -> Option<i64> {
        self.0.get(indicator).copied()
    }

    pub fn insert(&mut self, indicator: impl Into<String>, value: i64) -> Option<i64> {
        self.0.insert(indicator.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for CohortData {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
