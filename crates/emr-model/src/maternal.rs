use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{MaternalGroup, PatientId};

/// Maternal status of a set of female patients as reported by the EMR.
///
/// Only the pregnant and breastfeeding subsets are returned; any patient in
/// neither list is classified as not pregnant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaternalStatus {
    #[serde(rename = "FP", default)]
    pub pregnant: Vec<PatientId>,
    #[serde(rename = "FBf", default)]
    pub breastfeeding: Vec<PatientId>,
}

impl MaternalStatus {
    pub fn is_empty(&self) -> bool {
        self.pregnant.is_empty() && self.breastfeeding.is_empty()
    }

    /// Builds set-backed membership lookups.
    pub fn index(&self) -> MaternalIndex {
        MaternalIndex {
            pregnant: self.pregnant.iter().copied().collect(),
            breastfeeding: self.breastfeeding.iter().copied().collect(),
        }
    }
}

/// Membership sets derived from a [`MaternalStatus`].
#[derive(Debug, Clone, Default)]
pub struct MaternalIndex {
    pregnant: BTreeSet<PatientId>,
    breastfeeding: BTreeSet<PatientId>,
}

impl MaternalIndex {
    /// Whether `id` belongs in the row for `group`.
    ///
    /// A patient listed as both pregnant and breastfeeding belongs to both the
    /// FP and FBf rows and never to FNP.
    pub fn belongs_to(&self, group: MaternalGroup, id: PatientId) -> bool {
        match group {
            MaternalGroup::Pregnant => self.pregnant.contains(&id),
            MaternalGroup::Breastfeeding => self.breastfeeding.contains(&id),
            MaternalGroup::NotPregnant => {
                !self.pregnant.contains(&id) && !self.breastfeeding.contains(&id)
            }
        }
    }
}
