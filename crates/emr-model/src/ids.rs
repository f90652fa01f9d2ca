#![deny(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ModelError;

/// Identifier of a patient as issued by the EMR.
///
/// Report endpoints are not consistent about how they encode patients: most
/// send bare numbers, some send numeric strings and a few send whole patient
/// records carrying a `patient_id` field. All three deserialize to the same
/// `PatientId`; serialization always emits the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PatientId(u64);

impl PatientId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PatientId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ModelError::InvalidPatientId(s.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatientRef {
    Number(u64),
    Text(String),
    Record { patient_id: PatientId },
}

impl<'de> Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match PatientRef::deserialize(deserializer)? {
            PatientRef::Number(value) => Ok(Self(value)),
            PatientRef::Text(text) => text.parse().map_err(serde::de::Error::custom),
            PatientRef::Record { patient_id } => Ok(patient_id),
        }
    }
}
