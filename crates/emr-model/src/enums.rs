//! Type-safe enumerations for report disaggregation.
//!
//! Reports slice every indicator by gender and, for females, optionally by
//! maternal status. The API encodes these as short codes (`M`, `F`, `FP`,
//! `FNP`, `FBf`); the enums below keep those codes on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Gender as used in disaggregated report payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// Both genders in the order reports render them.
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Returns the short code used by the API.
    pub fn as_code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// Returns the display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ModelError;

    /// Accepts short codes and full names, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "M" | "MALE" => Ok(Gender::Male),
            "F" | "FEMALE" => Ok(Gender::Female),
            _ => Err(ModelError::UnknownGender(s.to_string())),
        }
    }
}

/// Maternal-status sub-classification of female patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaternalGroup {
    /// Currently pregnant.
    #[serde(rename = "FP")]
    Pregnant,
    /// Neither pregnant nor breastfeeding.
    #[serde(rename = "FNP")]
    NotPregnant,
    /// Currently breastfeeding.
    #[serde(rename = "FBf")]
    Breastfeeding,
}

impl MaternalGroup {
    /// Groups in report order.
    pub const ALL: [MaternalGroup; 3] = [
        MaternalGroup::Pregnant,
        MaternalGroup::NotPregnant,
        MaternalGroup::Breastfeeding,
    ];

    pub fn as_code(&self) -> &'static str {
        match self {
            MaternalGroup::Pregnant => "FP",
            MaternalGroup::NotPregnant => "FNP",
            MaternalGroup::Breastfeeding => "FBf",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaternalGroup::Pregnant => "Pregnant",
            MaternalGroup::NotPregnant => "Not pregnant",
            MaternalGroup::Breastfeeding => "Breastfeeding",
        }
    }
}

impl fmt::Display for MaternalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for MaternalGroup {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FP" => Ok(MaternalGroup::Pregnant),
            "FNP" => Ok(MaternalGroup::NotPregnant),
            "FBF" => Ok(MaternalGroup::Breastfeeding),
            _ => Err(ModelError::UnknownMaternalGroup(s.to_string())),
        }
    }
}

/// The disaggregation a report row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenderGroup {
    Gender(Gender),
    Maternal(MaternalGroup),
}

impl GenderGroup {
    pub fn as_code(&self) -> &'static str {
        match self {
            GenderGroup::Gender(gender) => gender.as_code(),
            GenderGroup::Maternal(group) => group.as_code(),
        }
    }
}

impl From<Gender> for GenderGroup {
    fn from(gender: Gender) -> Self {
        GenderGroup::Gender(gender)
    }
}

impl From<MaternalGroup> for GenderGroup {
    fn from(group: MaternalGroup) -> Self {
        GenderGroup::Maternal(group)
    }
}

impl fmt::Display for GenderGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenderGroup::Gender(gender) => write!(f, "{gender}"),
            GenderGroup::Maternal(group) => write!(f, "{group}"),
        }
    }
}
