//! Shared data model for EMR cohort and disaggregated reports.

pub mod age_group;
pub mod cohort;
pub mod enums;
pub mod error;
pub mod ids;
pub mod indicator;
pub mod maternal;
pub mod report;

pub use age_group::{AGE_GROUPS, ALL_AGES};
pub use cohort::CohortData;
pub use enums::{Gender, GenderGroup, MaternalGroup};
pub use error::{ModelError, Result};
pub use ids::PatientId;
pub use indicator::{
    CountSet, DisaggregatedResponse, FlatBucket, GenderBuckets, IndicatorBucket, IndicatorSet,
    RawIndicatorValue, RoutineTargeted, flatten_bucket, flatten_indicators,
};
pub use maternal::{MaternalIndex, MaternalStatus};
pub use report::{AggregatedReport, CountRow, GenderReport, ReportRow};
