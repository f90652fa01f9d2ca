//! Report request parameters.
//!
//! The facility a report is scoped to travels in an explicit
//! [`ReportContext`]; [`ReportQuery`] holds the reporting period and turns
//! both into the query parameters every report endpoint expects.

use chrono::NaiveDate;
use emr_client::QueryParams;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::Result;

/// Location id sent when no facility has been resolved.
pub const NO_FACILITY: i64 = -1;

/// ART program id used by report endpoints scoped to a program.
pub const DEFAULT_PROGRAM_ID: u32 = 1;

/// Facility and program a report is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    pub facility_id: Option<i64>,
    pub program_id: u32,
}

impl Default for ReportContext {
    fn default() -> Self {
        Self {
            facility_id: None,
            program_id: DEFAULT_PROGRAM_ID,
        }
    }
}

impl ReportContext {
    pub fn for_facility(facility_id: i64) -> Self {
        Self {
            facility_id: Some(facility_id),
            ..Self::default()
        }
    }

    /// The `location` parameter value, [`NO_FACILITY`] when unresolved.
    pub fn location(&self) -> i64 {
        self.facility_id.unwrap_or(NO_FACILITY)
    }

    pub fn has_facility(&self) -> bool {
        self.location() != NO_FACILITY
    }
}

/// Reporting period of a report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    date: NaiveDate,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    /// Whether the `date` anchor is sent with every request.
    pub use_default_params: bool,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self::new(dates::today())
    }
}

impl ReportQuery {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            start_date: None,
            end_date: None,
            use_default_params: true,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Sets the reporting date from any accepted date format.
    pub fn set_date(&mut self, date: &str) -> Result<()> {
        self.date = dates::parse_date(date)?;
        Ok(())
    }

    pub fn set_start_date(&mut self, date: &str) -> Result<()> {
        self.start_date = Some(dates::parse_date(date)?);
        Ok(())
    }

    pub fn set_end_date(&mut self, date: &str) -> Result<()> {
        self.end_date = Some(dates::parse_date(date)?);
        Ok(())
    }

    /// Sets both ends of the period at once.
    pub fn set_period(&mut self, start: NaiveDate, end: NaiveDate) {
        self.start_date = Some(start);
        self.end_date = Some(end);
    }

    /// The period as `DD/Mon/YYYY - DD/Mon/YYYY`, or `-` when incomplete.
    pub fn date_interval_period(&self) -> String {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!(
                "{} - {}",
                dates::to_display_fmt(start),
                dates::to_display_fmt(end)
            ),
            _ => "-".to_string(),
        }
    }

    /// Builds the query parameters for a report request.
    ///
    /// `location` always comes first. The `date` anchor follows when
    /// [`ReportQuery::use_default_params`] is set, and the period bounds only
    /// when both are known. Entries in `extra` override anything built here.
    /// The facility is not checked; see [`ReportContext::has_facility`].
    pub fn build_params(&self, context: &ReportContext, extra: Option<QueryParams>) -> QueryParams {
        let mut params = QueryParams::new().with("location", context.location());
        if self.use_default_params {
            params.set("date", dates::to_standard_fmt(self.date));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            params.set("start_date", dates::to_standard_fmt(start));
            params.set("end_date", dates::to_standard_fmt(end));
        }
        if let Some(extra) = extra {
            params.merge(extra);
        }
        params
    }
}
