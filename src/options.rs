/// Configures transport behavior of a [`RequestTemplate`](crate::RequestTemplate).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Keep idle connections in the pool between requests.
    ///
    /// Disable when one template is shared by several `#[tokio::test]`
    /// functions: pooled connections belong to the runtime that opened them.
    pub reuse_connections: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            reuse_connections: true,
        }
    }
}
