//! Reporting dates: formats, quarters and simple arithmetic.

use std::fmt;

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Format used for every date sent to the API.
pub const STANDARD_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used when showing dates to people, e.g. `05/Mar/2024`.
pub const STANDARD_DISPLAY_FORMAT: &str = "%d/%b/%Y";

/// Number of quarters offered by default when picking a reporting period.
pub const DEFAULT_REPORT_QUARTERS: usize = 5;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn tomorrow() -> NaiveDate {
    today() + Days::new(1)
}

/// Parses a date given either in the standard or the display format.
///
/// Timestamps such as `2024-03-05T10:00:00Z` are accepted and truncated to
/// their date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    let date_part = input.split_once('T').map_or(input, |(date, _)| date);
    NaiveDate::parse_from_str(date_part, STANDARD_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(input, STANDARD_DISPLAY_FORMAT))
        .map_err(|_| ReportError::Date(input.to_string()))
}

pub fn to_standard_fmt(date: NaiveDate) -> String {
    date.format(STANDARD_DATE_FORMAT).to_string()
}

pub fn to_display_fmt(date: NaiveDate) -> String {
    date.format(STANDARD_DISPLAY_FORMAT).to_string()
}

/// `date` moved back by `days` days, saturating at the earliest date.
pub fn subtract_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Completed years between `birth` and `on`.
pub fn age_in_years(birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut years = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

/// A calendar quarter as offered in report period pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    /// 1 through 4.
    pub number: u32,
}

impl Quarter {
    /// The quarter containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            number: date.month0() / 3 + 1,
        }
    }

    pub fn start(&self) -> NaiveDate {
        let month = (self.number - 1) * 3 + 1;
        NaiveDate::from_ymd_opt(self.year, month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn end(&self) -> NaiveDate {
        let next_start = self
            .start()
            .checked_add_months(Months::new(3))
            .unwrap_or(NaiveDate::MAX);
        next_start.pred_opt().unwrap_or(next_start)
    }

    #[must_use]
    pub fn previous(&self) -> Self {
        if self.number == 1 {
            Self {
                year: self.year - 1,
                number: 4,
            }
        } else {
            Self {
                year: self.year,
                number: self.number - 1,
            }
        }
    }

    /// The `(start, end)` pair formatted for the API.
    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: to_standard_fmt(self.start()),
            end: to_standard_fmt(self.end()),
        }
    }
}

impl fmt::Display for Quarter {
    /// Renders as `Q<n> <year>`, the name cohort reports are keyed by.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.number, self.year)
    }
}

/// A date range in the standard API format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Start and end of the quarter containing `date`.
pub fn quarter_dates(date: NaiveDate) -> DateRange {
    Quarter::containing(date).date_range()
}

/// The `max_quarters` most recent quarters, newest first, starting with the
/// quarter that contains `from`.
pub fn report_quarters(from: NaiveDate, max_quarters: usize) -> Vec<Quarter> {
    std::iter::successors(Some(Quarter::containing(from)), |quarter| {
        Some(quarter.previous())
    })
    .take(max_quarters)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_formats() {
        let d = date(2024, 3, 5);
        assert_eq!(to_standard_fmt(d), "2024-03-05");
        assert_eq!(to_display_fmt(d), "05/Mar/2024");
        assert_eq!(parse_date("05/Mar/2024").unwrap(), d);
        assert_eq!(parse_date("2024-03-05T08:30:00Z").unwrap(), d);
        assert!(matches!(parse_date("yesterday"), Err(ReportError::Date(_))));
    }

    #[test]
    fn test_quarter_dates() {
        assert_eq!(
            quarter_dates(date(2024, 2, 29)),
            DateRange {
                start: "2024-01-01".to_string(),
                end: "2024-03-31".to_string()
            }
        );
        assert_eq!(quarter_dates(date(2024, 5, 1)).end, "2024-06-30");
        assert_eq!(quarter_dates(date(2024, 9, 30)).start, "2024-07-01");
        assert_eq!(quarter_dates(date(2024, 12, 31)).end, "2024-12-31");
    }

    #[test]
    fn test_report_quarters_cross_year() {
        let quarters = report_quarters(date(2024, 4, 15), 3);
        let names: Vec<String> = quarters.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["Q2 2024", "Q1 2024", "Q4 2023"]);
        assert_eq!(quarters[2].start(), date(2023, 10, 1));
        assert_eq!(quarters[2].end(), date(2023, 12, 31));
    }

    #[test]
    fn test_age_and_subtract() {
        assert_eq!(age_in_years(date(2000, 6, 15), date(2024, 6, 14)), 23);
        assert_eq!(age_in_years(date(2000, 6, 15), date(2024, 6, 15)), 24);
        assert_eq!(subtract_days(date(2024, 3, 1), 30), date(2024, 1, 31));
    }
}
