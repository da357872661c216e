/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Missing or malformed base URL; no request is sent against an undefined target.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Observed status is not in the expected set.
    #[error("unexpected status {actual} (expected one of {expected:?}): {body}")]
    UnexpectedStatus {
        /// Accepted status codes.
        expected: Vec<u16>,
        /// Status code actually returned.
        actual: u16,
        /// Raw response body, kept for diagnosis.
        body: String,
    },
    /// Response body could not be decoded into the requested shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// Request could not be built (bad header, unserializable body).
    #[error("request error: {0}")]
    Request(String),
}
