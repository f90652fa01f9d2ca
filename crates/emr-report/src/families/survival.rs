//! Cohort survival analysis.
//!
//! The payload maps each cohort quarter to its outcomes, and each outcome to
//! patient counts keyed by the follow-up interval in months.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{NOT_AVAILABLE, as_count};
use crate::error::ReportError;

pub const SURVIVAL_REPORT: &str = "cohort_survival_analysis";

pub const ALIVE: &str = "On antiretrovirals";
pub const DIED: &str = "Patient died";
pub const DEFAULTED: &str = "Defaulted";
pub const STOPPED: &str = "Treatment stopped";
pub const TRANSFERRED: &str = "Patient transferred out";

/// Outcomes in the order they are reported.
pub const OUTCOMES: [&str; 6] = [ALIVE, DIED, DEFAULTED, STOPPED, TRANSFERRED, NOT_AVAILABLE];

/// Population a survival analysis is run for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurvivalGroup {
    #[default]
    General,
    Children,
    Women,
}

impl SurvivalGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurvivalGroup::General => "General",
            SurvivalGroup::Children => "Children",
            SurvivalGroup::Women => "Women",
        }
    }
}

impl fmt::Display for SurvivalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurvivalGroup {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(SurvivalGroup::General),
            "children" => Ok(SurvivalGroup::Children),
            "women" => Ok(SurvivalGroup::Women),
            _ => Err(ReportError::Decode {
                report: SURVIVAL_REPORT.to_string(),
                message: format!("unknown age group '{s}'"),
            }),
        }
    }
}

/// Outcome counts of one cohort quarter at its follow-up interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivalRow {
    pub sub_group: SurvivalGroup,
    pub quarter: String,
    pub interval: Option<u32>,
    pub alive: u64,
    pub died: u64,
    pub defaulted: u64,
    pub stopped: u64,
    pub transferred: u64,
    pub unknown: u64,
    pub total: u64,
}

/// Follow-up interval of a quarter, read from its first outcome.
///
/// Outcomes are consulted in report order; interval keys are months and the
/// smallest one is used.
fn outcome_interval(outcomes: &Map<String, Value>) -> Option<u32> {
    let first = OUTCOMES
        .iter()
        .find_map(|outcome| outcomes.get(*outcome))
        .or_else(|| outcomes.values().next())?;
    first
        .as_object()?
        .keys()
        .filter_map(|key| key.trim().parse::<u32>().ok())
        .min()
}

/// Sort key for quarter names such as `Q3 2019`; other names sort last.
fn quarter_order(name: &str) -> (i32, u32) {
    name.strip_prefix('Q')
        .and_then(|rest| rest.split_once(' '))
        .and_then(|(number, year)| Some((year.trim().parse().ok()?, number.parse().ok()?)))
        .unwrap_or((i32::MAX, u32::MAX))
}

/// One row per quarter with outcomes, oldest quarter first.
pub fn build_survival(data: &Value, sub_group: SurvivalGroup) -> Vec<SurvivalRow> {
    let Some(quarters) = data.as_object() else {
        return Vec::new();
    };

    let mut rows: Vec<SurvivalRow> = quarters
        .iter()
        .filter_map(|(quarter, outcomes)| {
            let outcomes = outcomes.as_object().filter(|o| !o.is_empty())?;
            let interval = outcome_interval(outcomes);
            let key = interval.map(|i| i.to_string()).unwrap_or_default();
            let counts = OUTCOMES.map(|outcome| {
                outcomes
                    .get(outcome)
                    .and_then(|by_interval| by_interval.get(&key))
                    .map_or(0, as_count)
            });
            Some(SurvivalRow {
                sub_group,
                quarter: quarter.clone(),
                interval,
                alive: counts[0],
                died: counts[1],
                defaulted: counts[2],
                stopped: counts[3],
                transferred: counts[4],
                unknown: counts[5],
                total: counts.iter().fold(0, |sum, count| sum.saturating_add(*count)),
            })
        })
        .collect();
    rows.sort_by_key(|row| quarter_order(&row.quarter));
    rows
}
