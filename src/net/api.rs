//! REST client for the library backend.
//!
//! Every backend call funnels through [`ApiClient::request`], which resolves
//! the path against the configured base URL, attaches the stored bearer
//! credential, and normalizes failures into [`ApiError`].
//!
//! ERROR HANDLING
//! ==============
//! A response that arrived with a non-2xx status becomes
//! [`ApiError::Status`] carrying the backend's own message when it sent one.
//! No response at all becomes [`ApiError::Network`]. Nothing is retried.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::fmt;
use std::sync::Arc;

pub use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::storage::{SessionRecord, Storage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),
    /// A 2xx body was not the JSON the caller expected.
    #[error("invalid response body: {0}")]
    Decode(String),
    /// The request could not be built (bad URL, header, or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401, the signal that a stored credential is stale.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Per-call options for [`ApiClient::request`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Extra headers, applied after (and overriding) the defaults.
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::GET, body: None, headers: Vec::new() }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post() -> Self {
        Self { method: Method::POST, ..Self::default() }
    }

    #[must_use]
    pub fn delete() -> Self {
        Self { method: Method::DELETE, ..Self::default() }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach any serializable value as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if `body` cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        Ok(self.with_body(value))
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Cheap to clone; clones share the connection pool and storage.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http: reqwest::Client::new(), base_url, storage }
    }

    pub fn from_config(config: &ClientConfig, storage: Arc<dyn Storage>) -> Self {
        Self::new(config.api_url.clone(), storage)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The storage this client reads its credential from.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Issue a request and return the decoded JSON body.
    ///
    /// An empty 2xx body decodes as `Value::Null`.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let RequestOptions { method, body, headers } = options;
        let url = self.url(path);
        tracing::debug!(%method, %url, "api request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(record) = SessionRecord::load(self.storage.as_ref()) {
            request = request.bearer_auth(record.token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }
        if !headers.is_empty() {
            request = request.headers(header_map(&headers)?);
        }

        let response = request.send().await.map_err(send_error)?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(status.as_u16(), &text);
            tracing::debug!(%method, %url, status = status.as_u16(), %message, "api request failed");
            return Err(ApiError::Status { status: status.as_u16(), message });
        }

        parse_body(&text)
    }

    /// Issue a request and deserialize the body into `T`.
    ///
    /// # Errors
    ///
    /// As [`Self::request`], plus [`ApiError::Decode`] when the body does not
    /// match `T`.
    pub async fn request_json<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError> {
        let value = self.request(path, options).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, ApiError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        map.append(name, value);
    }
    Ok(map)
}

fn send_error(error: reqwest::Error) -> ApiError {
    if error.is_builder() {
        ApiError::InvalidRequest(error.to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}

fn request_failed_message(status: u16) -> String {
    format!("request failed with status {status}")
}

/// Human-readable message for a failed response: the body's `message`, else
/// its `error`, else a generic line carrying the status.
fn error_message(status: u16, body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return request_failed_message(status);
    };
    ["message", "error"]
        .iter()
        .filter_map(|field| json.get(field).and_then(Value::as_str))
        .find(|message| !message.trim().is_empty())
        .map_or_else(|| request_failed_message(status), ToOwned::to_owned)
}

fn parse_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}
