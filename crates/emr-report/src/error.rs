//! Error types for report fetching and building.

use emr_client::ApiError;
use thiserror::Error;

/// Errors raised while requesting or shaping a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    /// No facility is selected; reports are always scoped to one.
    #[error("no facility selected; set a facility id before requesting reports")]
    NoFacility,

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The API answered with JSON that does not match the report shape.
    #[error("unexpected {report} payload: {message}")]
    Decode { report: String, message: String },

    #[error("invalid date '{0}'")]
    Date(String),

    #[error("dashboard cache error: {0}")]
    Cache(String),
}

impl ReportError {
    pub(crate) fn decode(report: &str, err: &serde_json::Error) -> Self {
        Self::Decode {
            report: report.to_string(),
            message: err.to_string(),
        }
    }

    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::NoFacility => "Select a facility before running a report.",
            Self::Api(err) => err.user_message(),
            Self::Decode { .. } => "The EMR returned a report in an unexpected format.",
            Self::Date(_) => "Dates must be given as YYYY-MM-DD.",
            Self::Cache(_) => "The dashboard cache could not be used.",
        }
    }
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
