//! Report families and the builders that shape their payloads.
//!
//! Each family names its endpoint and indicators and turns the raw payload
//! into rows. Builders are pure: they borrow the payload and never fail on
//! a missing path.

pub mod cohort_disaggregated;
pub mod regimen;
pub mod survival;
pub mod tb_prev;
pub mod tpt;
pub mod tx_tb;
pub mod viral_load;

use std::fmt;
use std::str::FromStr;

use emr_model::{AggregatedReport, CountRow, DisaggregatedResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ReportError, Result};
use regimen::WeightBand;
use survival::{SurvivalGroup, SurvivalRow};

/// Column used for values that carry no regimen.
pub const NOT_AVAILABLE: &str = "N/A";

/// ART regimens reported as separate columns, in display order.
pub const REGIMENS: [&str; 33] = [
    "0A", "0P", "2A", "2P", "4A", "4PP", "4PA", "5A", "6A", "7A", "8A", "9A", "9PP", "9PA", "10A",
    "11A", "11PP", "11PA", "12A", "12PP", "12PA", "13A", "14A", "14PP", "14PA", "15A", "15PP",
    "15PA", "16A", "16P", "17A", "17PP", "17PA",
];

/// Regimen columns followed by [`NOT_AVAILABLE`].
pub fn regimen_columns() -> impl Iterator<Item = &'static str> {
    REGIMENS.into_iter().chain(std::iter::once(NOT_AVAILABLE))
}

/// The report families this crate knows how to shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFamily {
    /// Cohort patients by age group and gender.
    CohortDisaggregated,
    /// Viral load coverage (TX_PVLS).
    TxPvls,
    VlByRegimen,
    /// TB prevention (TB_PREV).
    TbPrev,
    /// TB screening (TX_TB).
    TxTb,
    RegimensByWeight,
    Tpt,
    Survival,
}

impl ReportFamily {
    pub const ALL: [ReportFamily; 8] = [
        ReportFamily::CohortDisaggregated,
        ReportFamily::TxPvls,
        ReportFamily::VlByRegimen,
        ReportFamily::TbPrev,
        ReportFamily::TxTb,
        ReportFamily::RegimensByWeight,
        ReportFamily::Tpt,
        ReportFamily::Survival,
    ];

    /// Endpoint name of the family's report.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReportFamily::CohortDisaggregated => cohort_disaggregated::COHORT_DISAGGREGATED_REPORT,
            ReportFamily::TxPvls => viral_load::TX_PVLS_REPORT,
            ReportFamily::VlByRegimen => viral_load::VL_BY_REGIMEN_REPORT,
            ReportFamily::TbPrev => tb_prev::TB_PREV_REPORT,
            ReportFamily::TxTb => tx_tb::TX_TB_REPORT,
            ReportFamily::RegimensByWeight => regimen::REGIMENS_BY_WEIGHT_REPORT,
            ReportFamily::Tpt => tpt::TPT_REPORT,
            ReportFamily::Survival => survival::SURVIVAL_REPORT,
        }
    }

    /// Whether the endpoint lives under `programs/<id>/reports/`.
    pub fn is_program_report(&self) -> bool {
        matches!(self, ReportFamily::RegimensByWeight)
    }

    /// Indicator columns of the disaggregated families.
    pub fn indicators(&self) -> Vec<String> {
        match self {
            ReportFamily::CohortDisaggregated => {
                cohort_disaggregated::cohort_disaggregated_indicators()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            }
            ReportFamily::TxPvls => viral_load::tx_pvls_indicators()
                .into_iter()
                .map(str::to_string)
                .collect(),
            ReportFamily::TxTb => tx_tb::tx_tb_indicators()
                .into_iter()
                .map(str::to_string)
                .collect(),
            ReportFamily::TbPrev => tb_prev::tb_prev_columns(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ReportFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for ReportFamily {
    type Err = ReportError;

    /// Accepts endpoint names and the usual short names (`tx_pvls`, `tpt`, ...).
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase().replace('-', "_");
        ReportFamily::ALL
            .into_iter()
            .find(|family| family.endpoint() == name)
            .or(match name.as_str() {
                "disaggregated" => Some(ReportFamily::CohortDisaggregated),
                "tx_pvls" => Some(ReportFamily::TxPvls),
                "vl_by_regimen" => Some(ReportFamily::VlByRegimen),
                "tb_prev" => Some(ReportFamily::TbPrev),
                "regimens_by_weight" => Some(ReportFamily::RegimensByWeight),
                "tpt" => Some(ReportFamily::Tpt),
                "survival" => Some(ReportFamily::Survival),
                _ => None,
            })
            .ok_or_else(|| ReportError::Decode {
                report: s.to_string(),
                message: "unknown report family".to_string(),
            })
    }
}

/// A report payload shaped by its family builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BuiltReport {
    Disaggregated(AggregatedReport),
    Counts(Vec<CountRow>),
    Survival(Vec<SurvivalRow>),
    Rows(Vec<Value>),
}

/// Shapes a raw payload of `family`.
///
/// A `null` payload builds an empty report. Payloads of the wrong JSON shape
/// are a [`ReportError::Decode`].
pub fn build_report(
    family: ReportFamily,
    payload: &Value,
    survival_group: SurvivalGroup,
) -> Result<BuiltReport> {
    let report = family.endpoint();
    let decode = |err: serde_json::Error| ReportError::decode(report, &err);
    let disaggregated = || -> Result<DisaggregatedResponse> {
        if payload.is_null() {
            Ok(DisaggregatedResponse::new())
        } else {
            DisaggregatedResponse::deserialize(payload).map_err(decode)
        }
    };

    Ok(match family {
        ReportFamily::CohortDisaggregated => {
            let response = cohort_disaggregated::cohort_response(payload).map_err(decode)?;
            BuiltReport::Disaggregated(cohort_disaggregated::build_cohort_disaggregated(&response))
        }
        ReportFamily::TxPvls => {
            BuiltReport::Disaggregated(viral_load::build_tx_pvls(&disaggregated()?))
        }
        ReportFamily::TbPrev => {
            BuiltReport::Disaggregated(tb_prev::build_tb_prev(&disaggregated()?))
        }
        ReportFamily::TxTb => BuiltReport::Disaggregated(tx_tb::build_tx_tb(&disaggregated()?)),
        ReportFamily::VlByRegimen => {
            BuiltReport::Counts(viral_load::build_vl_by_regimen(payload))
        }
        ReportFamily::RegimensByWeight => {
            let bands = if payload.is_null() {
                Vec::new()
            } else {
                Vec::<WeightBand>::deserialize(payload).map_err(decode)?
            };
            BuiltReport::Counts(regimen::build_regimens_by_weight(&bands))
        }
        ReportFamily::Tpt => {
            let mut rows = match payload {
                Value::Null => Vec::new(),
                Value::Array(rows) => rows.clone(),
                other => {
                    return Err(ReportError::Decode {
                        report: report.to_string(),
                        message: format!("expected a list of rows, got {other}"),
                    });
                }
            };
            tpt::sort_by_gender(&mut rows);
            BuiltReport::Rows(rows)
        }
        ReportFamily::Survival => {
            BuiltReport::Survival(survival::build_survival(payload, survival_group))
        }
    })
}

/// Reads a count at `path`, treating anything absent or non-numeric as 0.
pub(crate) fn count_at(value: &Value, path: &[&str]) -> u64 {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .map_or(0, as_count)
}

/// Numeric value of a JSON leaf; numeric strings are accepted.
pub(crate) fn as_count(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
