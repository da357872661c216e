//! Request/response hooks attached to a [`RequestTemplate`](crate::RequestTemplate).
//!
//! Observers only look at exchanges; they cannot change a request or a
//! response. The default template carries a [`RequestLogger`] and a
//! [`ResponseLogger`], which emit `tracing` events.

use std::time::Duration;

use reqwest::{header::HeaderMap, Method, StatusCode, Url};

const REDACTED: &str = "<redacted>";

/// Outgoing request as seen by observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: Method,
    pub url: Url,
    /// Header name/value pairs; sensitive values are replaced by `<redacted>`.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Completed response as seen by observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseRecord {
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
    pub elapsed: Duration,
    pub body: String,
}

/// Hook invoked around every request sent through a template.
pub trait Observer: Send + Sync {
    fn on_request(&self, _request: &RequestRecord) {}

    fn on_response(&self, _response: &ResponseRecord) {}
}

/// Logs every outgoing request at `info` level, headers and body at `debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLogger;

impl Observer for RequestLogger {
    fn on_request(&self, request: &RequestRecord) {
        tracing::info!(method = %request.method, url = %request.url, "request");
        tracing::debug!(
            headers = ?request.headers,
            body = request.body.as_deref().unwrap_or("<none>"),
            "request details"
        );
    }
}

/// Logs every response status at `info` level and the body at `debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseLogger;

impl Observer for ResponseLogger {
    fn on_response(&self, response: &ResponseRecord) {
        tracing::info!(
            method = %response.method,
            url = %response.url,
            status = response.status.as_u16(),
            elapsed = ?response.elapsed,
            "response"
        );
        tracing::debug!(body = %response.body, "response body");
    }
}

pub(crate) fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if value.is_sensitive() || *name == reqwest::header::AUTHORIZATION {
                REDACTED.to_owned()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_owned(), shown)
        })
        .collect()
}
