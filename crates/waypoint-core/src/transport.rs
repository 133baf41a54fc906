//! HTTP transport
//!
//! Issues exactly one HTTP request per call against the configured backend,
//! races it against a timeout and classifies the outcome:
//!
//! 1. Status in `[200, 300)`: success, the raw response body is returned
//! 2. Any other status: `HTTP <status> <first 160 chars of body>`
//! 3. No response in time: the request is aborted, `timeout (<ms> ms)`
//! 4. Anything failing while dispatching: `send error: <detail>`
//!
//! Exactly one outcome is produced per call.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::Sleep;
use tracing::debug;

use crate::error::GatewayError;

/// Maximum number of body characters quoted in an HTTP error message
const ERROR_BODY_LIMIT: usize = 160;

/// HTTP methods used by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether a body sent with this method is labelled as JSON
    fn sends_json(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

/// Request body
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body
    #[default]
    Empty,
    /// Pre-serialized text, sent as-is
    Text(String),
    /// Structured value, serialized to JSON
    Json(Value),
}

impl Body {
    fn into_payload(self) -> Result<Option<String>, TransportError> {
        match self {
            Body::Empty => Ok(None),
            Body::Text(text) => Ok(Some(text)),
            Body::Json(value) => serde_json::to_string(&value)
                .map(Some)
                .map_err(|e| TransportError::Send(e.to_string())),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Body::Empty,
            other => Body::Json(other),
        }
    }
}

/// Failed transport outcome
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Backend answered with a non-2xx status
    #[error("{}", status_message(*status, body))]
    Status { status: u16, body: String },

    /// No response within the allotted time
    #[error("timeout ({ms} ms)")]
    Timeout { ms: u64 },

    /// The request could not be built or sent
    #[error("send error: {0}")]
    Send(String),
}

fn status_message(status: u16, body: &str) -> String {
    let mut snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    if body.chars().count() > ERROR_BODY_LIMIT {
        snippet.push('…');
    }
    if snippet.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {} {}", status, snippet)
    }
}

/// Build `path?k=v&…` with URL-encoded parameters
pub fn with_query<K, V>(path: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return path.to_string();
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    format!("{}?{}", path, serializer.finish())
}

/// One in-flight call racing its timer
///
/// `select!` drops the request future as soon as the timer fires, so a late
/// response can never be delivered after a timeout.
struct PendingRequest {
    timer: Pin<Box<Sleep>>,
    timeout_ms: u64,
}

impl PendingRequest {
    fn new(timeout: Duration) -> Self {
        Self {
            timer: Box::pin(tokio::time::sleep(timeout)),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Drive `request` to completion or until the timer fires
    ///
    /// The request future is dropped (aborting the connection) on timeout.
    async fn run<F>(mut self, request: F) -> Result<String, TransportError>
    where
        F: Future<Output = Result<String, TransportError>>,
    {
        tokio::pin!(request);
        tokio::select! {
            outcome = &mut request => outcome,
            _ = &mut self.timer => Err(TransportError::Timeout { ms: self.timeout_ms }),
        }
    }
}

/// HTTP transport bound to one backend base URL
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
}

impl Transport {
    /// Create a transport for `base_url` (e.g. `http://127.0.0.1:43098`)
    pub fn new(base_url: impl Into<String>, default_timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("waypoint-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GatewayError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_timeout,
        })
    }

    /// Send one request and classify the outcome
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Body,
        timeout: Option<Duration>,
    ) -> Result<String, TransportError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {} (timeout {:?})", method, url, timeout);

        let mut request = self.http.request(method.to_reqwest(), &url);
        if let Some(payload) = body.into_payload()? {
            if method.sends_json() {
                request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
            }
            request = request.body(payload);
        }

        let outcome = PendingRequest::new(timeout).run(dispatch(request)).await;
        match &outcome {
            Ok(_) => debug!("{} {} succeeded", method, path),
            Err(e) => debug!("{} {} failed: {}", method, path, e),
        }
        outcome
    }
}

async fn dispatch(request: reqwest::RequestBuilder) -> Result<String, TransportError> {
    let response = request
        .send()
        .await
        .map_err(|e| TransportError::Send(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TransportError::Send(e.to_string()))?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
