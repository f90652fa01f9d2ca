//! Maternal-status reclassification of female roll-ups.
//!
//! Female all-ages indicators are split into three rows, FP (pregnant), FNP
//! (neither) and FBf (breastfeeding), using the maternal status the EMR
//! reports for those patients.

use std::collections::BTreeSet;
use std::future::Future;

use emr_model::{
    ALL_AGES, AggregatedReport, Gender, IndicatorSet, MaternalGroup, MaternalStatus, PatientId,
    ReportRow,
};

use crate::error::Result;
use crate::families::ReportFamily;
use crate::families::tb_prev::tb_prev_columns;

/// Report definition used when asking for maternal status.
pub const DEFAULT_REPORT_DEFINITION: &str = "pepfar";

/// Source of the maternal status of female patients.
pub trait MaternalStatusLookup: Send + Sync {
    /// Status of `patients`; patients in neither returned list are neither
    /// pregnant nor breastfeeding.
    fn maternal_status(
        &self,
        patients: &[PatientId],
        report_definition: &str,
    ) -> impl Future<Output = Result<MaternalStatus>> + Send;
}

/// Every patient under `indicators`, once, in first-seen order.
pub fn unique_patients(female: &IndicatorSet, indicators: &[&str]) -> Vec<PatientId> {
    let mut seen = BTreeSet::new();
    indicators
        .iter()
        .filter_map(|indicator| female.get(*indicator))
        .flatten()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Splits female indicators into FP, FNP and FBf rows, in that order.
///
/// Each row keeps, per indicator, the original patients that belong to its
/// group, in their original order. A patient both pregnant and
/// breastfeeding appears in FP and FBf and never in FNP. Indicators absent
/// from `female` yield empty lists.
pub fn reclassify(
    female: &IndicatorSet,
    indicators: &[&str],
    status: &MaternalStatus,
) -> Vec<ReportRow> {
    let index = status.index();
    MaternalGroup::ALL
        .into_iter()
        .map(|group| {
            let mut row = ReportRow::new(group, ALL_AGES);
            for indicator in indicators {
                let patients = female
                    .get(*indicator)
                    .map(|ids| {
                        ids.iter()
                            .copied()
                            .filter(|id| index.belongs_to(group, *id))
                            .collect()
                    })
                    .unwrap_or_default();
                row.indicators.insert((*indicator).to_string(), patients);
            }
            row
        })
        .collect()
}

/// Maternal status of every female patient under `indicators`.
///
/// No lookup is made when there are no female patients.
pub async fn lookup_status<L: MaternalStatusLookup>(
    lookup: &L,
    female: &IndicatorSet,
    indicators: &[&str],
    report_definition: &str,
) -> Result<MaternalStatus> {
    let patients = unique_patients(female, indicators);
    let status = if patients.is_empty() {
        MaternalStatus::default()
    } else {
        lookup.maternal_status(&patients, report_definition).await?
    };
    tracing::debug!(
        patients = patients.len(),
        pregnant = status.pregnant.len(),
        breastfeeding = status.breastfeeding.len(),
        "Looked up maternal status"
    );
    Ok(status)
}

/// Looks up maternal status for the female patients and reclassifies them.
pub async fn maternity_rows<L: MaternalStatusLookup>(
    lookup: &L,
    female: &IndicatorSet,
    indicators: &[&str],
    report_definition: &str,
) -> Result<Vec<ReportRow>> {
    let status = lookup_status(lookup, female, indicators, report_definition).await?;
    Ok(reclassify(female, indicators, &status))
}

/// The all-ages roll-up of one gender as a single row.
pub fn all_ages_row(report: &AggregatedReport, gender: Gender, indicators: &[&str]) -> ReportRow {
    let gender_report = report.gender(gender);
    let mut row = ReportRow::new(gender, ALL_AGES);
    for indicator in indicators {
        let patients = gender_report.aggregate_of(indicator).to_vec();
        row.indicators.insert((*indicator).to_string(), patients);
        if let Some(count) = gender_report.counts.get(*indicator) {
            row.counts.insert((*indicator).to_string(), *count);
        }
    }
    row
}

/// TB prevention maternal view: the male all-ages row, then the female
/// roll-up of both TPT regimens split into FP, FNP and FBf.
pub fn reclassify_tb_prev(report: &AggregatedReport, status: &MaternalStatus) -> Vec<ReportRow> {
    let columns = tb_prev_columns();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    let mut rows = vec![all_ages_row(report, Gender::Male, &columns)];
    rows.extend(reclassify(&report.female.aggregate, &columns, status));
    rows
}

/// Maternal rows of a disaggregated `family` report.
pub fn reclassify_report(
    family: ReportFamily,
    report: &AggregatedReport,
    status: &MaternalStatus,
) -> Vec<ReportRow> {
    match family {
        ReportFamily::TbPrev => reclassify_tb_prev(report, status),
        _ => {
            let indicators = family.indicators();
            let indicators: Vec<&str> = indicators.iter().map(String::as_str).collect();
            reclassify(&report.female.aggregate, &indicators, status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_model::GenderGroup;

    fn ids(values: &[u64]) -> Vec<PatientId> {
        values.iter().copied().map(PatientId::new).collect()
    }

    fn female() -> IndicatorSet {
        IndicatorSet::from([
            ("tx_curr".to_string(), ids(&[1, 2, 3, 4])),
            ("due_for_vl".to_string(), ids(&[4, 2])),
        ])
    }

    #[test]
    fn test_rows_in_group_order() {
        let status = MaternalStatus {
            pregnant: ids(&[2]),
            breastfeeding: ids(&[2, 3]),
        };
        let rows = reclassify(&female(), &["tx_curr", "due_for_vl"], &status);
        let groups: Vec<_> = rows.iter().map(|r| r.gender).collect();
        assert_eq!(
            groups,
            [
                GenderGroup::Maternal(MaternalGroup::Pregnant),
                GenderGroup::Maternal(MaternalGroup::NotPregnant),
                GenderGroup::Maternal(MaternalGroup::Breastfeeding),
            ]
        );
        assert!(rows.iter().all(|r| r.age_group == ALL_AGES));

        assert_eq!(rows[0].patients("tx_curr"), ids(&[2]).as_slice());
        assert_eq!(rows[1].patients("tx_curr"), ids(&[1, 4]).as_slice());
        assert_eq!(rows[2].patients("tx_curr"), ids(&[2, 3]).as_slice());
        assert_eq!(rows[1].patients("due_for_vl"), ids(&[4]).as_slice());
    }

    #[test]
    fn test_unique_patients_first_seen() {
        assert_eq!(
            unique_patients(&female(), &["due_for_vl", "tx_curr"]),
            ids(&[4, 2, 1, 3])
        );
    }

    #[test]
    fn test_tb_prev_view_leads_with_males() {
        let mut report = AggregatedReport::default();
        report
            .male
            .aggregate
            .insert("3hp_started_new_on_art".to_string(), ids(&[20, 21]));
        report
            .female
            .aggregate
            .insert("3hp_started_new_on_art".to_string(), ids(&[1, 2]));
        report
            .female
            .aggregate
            .insert("6h_completed_new_on_art".to_string(), ids(&[2, 3]));
        let status = MaternalStatus {
            pregnant: ids(&[2]),
            breastfeeding: Vec::new(),
        };

        let rows = reclassify_report(ReportFamily::TbPrev, &report, &status);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].gender, GenderGroup::Gender(Gender::Male));
        assert_eq!(rows[0].age_group, ALL_AGES);
        assert_eq!(rows[0].patients("3hp_started_new_on_art"), ids(&[20, 21]).as_slice());
        assert_eq!(rows[0].indicators.len(), 8);

        assert_eq!(rows[1].patients("3hp_started_new_on_art"), ids(&[2]).as_slice());
        assert_eq!(rows[1].patients("6h_completed_new_on_art"), ids(&[2]).as_slice());
        assert_eq!(rows[2].patients("6h_completed_new_on_art"), ids(&[3]).as_slice());
        assert!(rows[3].patients("3hp_started_new_on_art").is_empty());
    }

    #[test]
    fn test_other_families_split_declared_indicators() {
        let mut report = AggregatedReport::default();
        report.female.aggregate = female();
        let rows = reclassify_report(ReportFamily::TxPvls, &report, &MaternalStatus::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].patients("tx_curr"), ids(&[1, 2, 3, 4]).as_slice());
        assert!(rows[1].indicators.contains_key("drawn_routine"));
    }

    #[test]
    fn test_missing_indicator_is_empty() {
        let rows = reclassify(&female(), &["high_vl"], &MaternalStatus::default());
        assert!(rows.iter().all(|r| r.patients("high_vl").is_empty()));
        assert!(rows.iter().all(|r| r.indicators.contains_key("high_vl")));
    }
}
