//! Error types for EMR API access.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by the EMR API client.
///
/// HTTP failures are categorized by status code the same way the EMR
/// front-end does: 400, 404, 409, 422 and 502 each get their own variant and
/// everything else collapses into [`ApiError::Api`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// 400: the request parameters were rejected.
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        errors: Option<Value>,
    },

    /// 404: the report or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// 409: the request conflicts with an existing record.
    #[error("record conflict: {message}")]
    Conflict {
        message: String,
        errors: Option<Value>,
    },

    /// 422: the entity failed server-side validation.
    #[error("unprocessable entity: {errors}")]
    Unprocessable {
        errors: Value,
        entity: Option<Value>,
    },

    /// 502: the API gateway could not reach the EMR service.
    #[error("API service error: {0}")]
    Service(String),

    /// Any other unsuccessful response.
    #[error("API error: {0}")]
    Api(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Json(String),

    /// The client configuration could not be loaded or used.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { .. } => "The EMR rejected the report parameters.",
            Self::NotFound(_) => "The requested report is not available on this EMR.",
            Self::Conflict { .. } => "The request conflicts with existing EMR records.",
            Self::Unprocessable { .. } => "The EMR could not process the submitted data.",
            Self::Service(_) => "The EMR service is unreachable behind its gateway.",
            Self::Network(_) => "Could not connect to the EMR. Please check the API configuration.",
            Self::Config(_) => "The API configuration is invalid.",
            Self::Api(_) | Self::Json(_) => "An internal server error has occurred.",
        }
    }

    /// HTTP status this error was categorized from, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::NotFound(_) => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Unprocessable { .. } => Some(422),
            Self::Service(_) => Some(502),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Json(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categories() {
        assert_eq!(ApiError::NotFound("x".to_string()).status(), Some(404));
        assert_eq!(ApiError::Service("down".to_string()).status(), Some(502));
        assert_eq!(ApiError::Network("refused".to_string()).status(), None);
    }

    #[test]
    fn test_user_messages() {
        let err = ApiError::Network("connection refused".to_string());
        assert!(err.user_message().contains("API configuration"));
        let err = ApiError::Json("eof".to_string());
        assert!(err.user_message().contains("internal server error"));
    }
}
