use reqwest::{header::HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::{ProbeError, Result};

/// Buffered result of one HTTP exchange.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Raw body text, decoded lazily by [`ApiResponse::json`].
    pub body: String,
}

impl ApiResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Fails with [`ProbeError::UnexpectedStatus`] unless the status is one of `expected`.
    pub fn expect_status(&self, expected: &[u16]) -> Result<&Self> {
        if expected.contains(&self.status_code()) {
            return Ok(self);
        }
        Err(ProbeError::UnexpectedStatus {
            expected: expected.to_vec(),
            actual: self.status_code(),
            body: self.body.clone(),
        })
    }

    /// Decodes the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|err| {
            ProbeError::Decode(format!("invalid response JSON: {err}; body: {}", self.body))
        })
    }

    /// Reads one value by JSON pointer (`/id`, `/data/0/email`).
    ///
    /// Returns `Ok(None)` when the body is JSON but the pointer does not
    /// resolve; JSON `null` is also reported as `None`.
    pub fn field(&self, pointer: &str) -> Result<Option<serde_json::Value>> {
        let value: serde_json::Value = self.json()?;
        Ok(value
            .pointer(pointer)
            .filter(|field| !field.is_null())
            .cloned())
    }
}
