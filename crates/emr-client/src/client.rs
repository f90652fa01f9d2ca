//! Async JSON client for the EMR API.

use std::future::Future;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::params::QueryParams;

/// User agent string for API requests.
const USER_AGENT_VALUE: &str = concat!("emr-reports/", env!("CARGO_PKG_VERSION"));

/// Something that can fetch JSON documents from the EMR API.
///
/// The report layer only depends on this trait so it can be driven by an
/// in-memory fake in tests.
pub trait JsonFetcher: Send + Sync {
    /// GET `path` with `params` and return the parsed body.
    fn get_json(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// POST `body` to `path` with `params` and return the parsed body.
    fn post_json(
        &self,
        path: &str,
        body: &Value,
        params: &QueryParams,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// EMR API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl ApiClient {
    /// Creates a client for the API described by `config`.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = reqwest::Url::parse(&config.base_url())
            .map_err(|e| ApiError::Config(format!("invalid API URL: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| ApiError::Config(format!("invalid API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// The URL every request path is joined onto.
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// Resolves an API path and its query parameters to a full URL.
    ///
    /// A leading `/` on `path` is ignored so that both `reports/x` and
    /// `/reports/x` land under the API version prefix.
    pub fn expand_path(&self, path: &str, params: &QueryParams) -> Result<reqwest::Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid API path {path:?}: {e}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.iter() {
                pairs.append_pair(key, &value.to_string());
            }
        }
        Ok(url)
    }

    /// GET `path` and parse the response body as JSON.
    pub async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<T> {
        let url = self.expand_path(path, params)?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let body = handle_response(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// POST a JSON body to `path` and parse the response body as JSON.
    pub async fn post<B, T>(&self, path: &str, body: &B, params: &QueryParams) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = self.expand_path(path, params)?;
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        let body = handle_response(response).await?;
        Ok(serde_json::from_value(body)?)
    }
}

impl JsonFetcher for ApiClient {
    fn get_json(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> impl Future<Output = Result<Value>> + Send {
        self.get::<Value>(path, params)
    }

    fn post_json(
        &self,
        path: &str,
        body: &Value,
        params: &QueryParams,
    ) -> impl Future<Output = Result<Value>> + Send {
        self.post::<Value, Value>(path, body, params)
    }
}

/// Checks the status of a response and parses its JSON body.
async fn handle_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if status == StatusCode::OK || status == StatusCode::CREATED {
        // Some endpoints answer 201 with an empty body.
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&text)?);
    }

    let text = response.text().await.unwrap_or_default();
    tracing::debug!("API responded with {}", status);
    Err(categorize_failure(status, &text))
}

/// Maps an unsuccessful status and its body onto an [`ApiError`].
fn categorize_failure(status: StatusCode, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| parsed.as_ref().and_then(|v| v.get(name)).cloned();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .and_then(Value::as_str)
        .map_or_else(|| body.trim().to_string(), str::to_string);

    match status {
        StatusCode::BAD_REQUEST => ApiError::BadRequest {
            message,
            errors: field("errors"),
        },
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::CONFLICT => ApiError::Conflict {
            message,
            errors: field("errors"),
        },
        StatusCode::UNPROCESSABLE_ENTITY => ApiError::Unprocessable {
            errors: field("errors").unwrap_or(Value::Null),
            entity: field("entity"),
        },
        StatusCode::BAD_GATEWAY => ApiError::Service(message),
        _ => ApiError::Api(format!("{status}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ApiClient {
        ApiClient::new(&ApiConfig::default()).unwrap()
    }

    #[test]
    fn test_client_creation_with_key() {
        let config = ApiConfig {
            api_key: Some("secret".to_string()),
            ..ApiConfig::default()
        };
        assert!(ApiClient::new(&config).is_ok());
    }

    #[test]
    fn test_expand_path() {
        let params = QueryParams::new().with("location", 706i64).with("date", "2024-03-31");
        let url = client().expand_path("/reports/tx_ml", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/api/v1/reports/tx_ml?location=706&date=2024-03-31"
        );
    }

    #[test]
    fn test_expand_path_without_params() {
        let url = client()
            .expand_path("programs/1/reports/regimens_by_weight_and_gender", &QueryParams::new())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/api/v1/programs/1/reports/regimens_by_weight_and_gender"
        );
    }

    #[test]
    fn test_categorize_unprocessable() {
        let body = json!({"errors": ["date is required"], "entity": {"id": 3}}).to_string();
        match categorize_failure(StatusCode::UNPROCESSABLE_ENTITY, &body) {
            ApiError::Unprocessable { errors, entity } => {
                assert_eq!(errors, json!(["date is required"]));
                assert_eq!(entity, Some(json!({"id": 3})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_categorize_status_codes() {
        assert!(matches!(
            categorize_failure(StatusCode::BAD_REQUEST, r#"{"message":"bad date"}"#),
            ApiError::BadRequest { ref message, .. } if message == "bad date"
        ));
        assert!(matches!(
            categorize_failure(StatusCode::NOT_FOUND, "no such report"),
            ApiError::NotFound(ref m) if m == "no such report"
        ));
        assert!(matches!(
            categorize_failure(StatusCode::CONFLICT, "{}"),
            ApiError::Conflict { .. }
        ));
        assert!(matches!(
            categorize_failure(StatusCode::BAD_GATEWAY, ""),
            ApiError::Service(_)
        ));
        assert!(matches!(
            categorize_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ApiError::Api(_)
        ));
    }
}
