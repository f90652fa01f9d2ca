//! EMR report requests and aggregation.
//!
//! - [`cohort`]: the cohort report the cohort rules validate
//! - [`query`]: reporting period and facility context, built into request parameters
//! - [`service`]: report fetching over any [`emr_client::JsonFetcher`]
//! - [`aggregate`]: gender and age-group aggregation of disaggregated payloads
//! - [`families`]: per-report builders (disaggregated cohort, TX_PVLS, TB_PREV, TX_TB,
//!   regimens, TPT, survival)
//! - [`maternal`]: FP / FNP / FBf reclassification of female roll-ups
//! - [`dates`]: reporting dates and quarters
//! - [`dashboard`]: dashboard statistics and their cache

pub mod aggregate;
pub mod cohort;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod families;
pub mod maternal;
pub mod query;
pub mod service;

pub use aggregate::{aggregate_disaggregated, aggregate_with};
pub use cohort::{CohortPeriod, CohortRequest, cohort_data};
pub use dashboard::{DashboardCache, DashboardStats, EncounterStat, refresh_dashboard};
pub use dates::Quarter;
pub use error::{ReportError, Result};
pub use families::cohort_disaggregated::CohortDisaggregation;
pub use families::survival::{SurvivalGroup, SurvivalRow};
pub use families::{BuiltReport, ReportFamily, build_report};
pub use maternal::{
    MaternalStatusLookup, all_ages_row, lookup_status, maternity_rows, reclassify,
    reclassify_report, reclassify_tb_prev,
};
pub use query::{NO_FACILITY, ReportContext, ReportQuery};
pub use service::ReportService;
