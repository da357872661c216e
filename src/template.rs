use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, StatusCode, Url,
};
use serde::Serialize;

use crate::{
    config::{self, join_url, parse_base_url},
    observer::{
        header_pairs, Observer, RequestLogger, RequestRecord, ResponseLogger, ResponseRecord,
    },
    probe::{poll_until, ProbePolicy, ProbeResult},
    ApiResponse, ClientOptions, ProbeError, Result,
};

/// Immutable request defaults shared by every test of a suite.
///
/// Built once, then only read: per-call settings go on the [`RequestSpec`]
/// returned by [`RequestTemplate::request`] and never write back.
#[derive(Clone)]
pub struct RequestTemplate {
    http: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    observers: Arc<[Arc<dyn Observer>]>,
    options: ClientOptions,
}

impl fmt::Debug for RequestTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTemplate")
            .field("base_url", &self.base_url.as_str())
            .field("default_headers", &header_pairs(&self.default_headers))
            .field("observers", &self.observers.len())
            .field("options", &self.options)
            .finish()
    }
}

impl RequestTemplate {
    /// Builds the standard template: `Content-Type: application/json` plus
    /// request and response loggers.
    ///
    /// Fails with [`ProbeError::Configuration`] when `base_url` is empty or
    /// malformed.
    pub fn initialize(base_url: impl AsRef<str>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    /// Builds the standard template from the `API_BASE_URL` environment variable.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use restprobe_http::RequestTemplate;
    ///
    /// let template = RequestTemplate::from_env().expect("missing API_BASE_URL");
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::from_env_var(config::API_BASE_URL_VAR)
    }

    /// Builds the standard template from the base URL stored in `name`.
    pub fn from_env_var(name: &str) -> Result<Self> {
        let base_url = config::base_url_from_env(name)?;
        Self::builder(base_url.as_str()).build()
    }

    /// Starts a template with custom headers, observers or options.
    pub fn builder(base_url: impl AsRef<str>) -> TemplateBuilder {
        TemplateBuilder {
            base_url: base_url.as_ref().to_owned(),
            headers: Vec::new(),
            observers: Vec::new(),
            default_observers: true,
            options: ClientOptions::default(),
        }
    }

    /// Returns a copy aimed at another base URL.
    ///
    /// Headers, observers and the connection pool are shared; `self` is
    /// left as it was.
    pub fn with_base_url(&self, base_url: impl AsRef<str>) -> Result<Self> {
        let mut copy = self.clone();
        copy.base_url = parse_base_url(base_url.as_ref())?;
        Ok(copy)
    }

    /// Validated base URL every request path is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers sent with every request unless a [`RequestSpec`] overrides them.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Transport options the template was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Resolves `path` against the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        join_url(&self.base_url, path)
    }

    /// Starts a request derived from this template.
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestSpec<'_> {
        RequestSpec {
            template: self,
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            error: None,
        }
    }

    /// Starts a `GET` request.
    pub fn get(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::GET, path)
    }

    /// Starts a `POST` request.
    pub fn post(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::POST, path)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::PUT, path)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::DELETE, path)
    }

    /// Polls `path` with GET until it answers `200 OK` or `policy` runs out.
    ///
    /// Transport errors are returned immediately, without further attempts.
    pub async fn poll_until_success(
        &self,
        path: &str,
        policy: &ProbePolicy,
    ) -> Result<ProbeResult<StatusCode>> {
        self.poll_until(path, policy, |status| *status == StatusCode::OK).await
    }

    /// Polls `path` with GET until `predicate` accepts the status.
    pub async fn poll_until<P>(
        &self,
        path: &str,
        policy: &ProbePolicy,
        predicate: P,
    ) -> Result<ProbeResult<StatusCode>>
    where
        P: FnMut(&StatusCode) -> bool,
    {
        poll_until(
            policy,
            move || async move { self.get(path).send().await.map(|response| response.status) },
            predicate,
        )
        .await
    }

    fn notify_request(&self, record: &RequestRecord) {
        for observer in self.observers.iter() {
            observer.on_request(record);
        }
    }

    fn notify_response(&self, record: &ResponseRecord) {
        for observer in self.observers.iter() {
            observer.on_response(record);
        }
    }
}

/// Builder for a [`RequestTemplate`].
pub struct TemplateBuilder {
    base_url: String,
    headers: Vec<(String, String)>,
    observers: Vec<Arc<dyn Observer>>,
    default_observers: bool,
    options: ClientOptions,
}

impl TemplateBuilder {
    /// Adds a default header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attaches an extra observer after the default loggers.
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Drops the built-in request and response loggers.
    pub fn without_default_observers(mut self) -> Self {
        self.default_observers = false;
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<RequestTemplate> {
        let base_url = parse_base_url(&self.base_url)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        for (name, value) in &self.headers {
            let (name, value) = parse_header(name, value).map_err(|err| {
                ProbeError::Configuration(format!("invalid default header: {err}"))
            })?;
            default_headers.insert(name, value);
        }

        let mut observers: Vec<Arc<dyn Observer>> = Vec::with_capacity(self.observers.len() + 2);
        if self.default_observers {
            observers.push(Arc::new(RequestLogger));
            observers.push(Arc::new(ResponseLogger));
        }
        observers.extend(self.observers);

        let mut client = reqwest::Client::builder();
        if !self.options.reuse_connections {
            client = client.pool_max_idle_per_host(0);
        }
        let http = client.build().map_err(|err| {
            ProbeError::Configuration(format!("could not build HTTP client: {err}"))
        })?;

        tracing::debug!(base_url = %base_url, "request template initialized");

        Ok(RequestTemplate {
            http,
            base_url,
            default_headers,
            observers: observers.into(),
            options: self.options,
        })
    }
}

/// One request derived from a [`RequestTemplate`].
///
/// Builder errors are kept until [`RequestSpec::send`], like `reqwest`'s own
/// request builder.
pub struct RequestSpec<'a> {
    template: &'a RequestTemplate,
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<String>,
    error: Option<ProbeError>,
}

impl RequestSpec<'_> {
    /// Adds or overrides a header for this request only.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match parse_header(name, value) {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    ///
    /// If the token already carries the `Bearer ` prefix it is kept as is.
    pub fn bearer(mut self, token: &str) -> Self {
        match HeaderValue::from_str(&normalize_bearer_authorization(token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(header::AUTHORIZATION, value);
            }
            Err(err) => self.fail(ProbeError::Request(format!("invalid bearer token: {err}"))),
        }
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Serializes `payload` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => self.body = Some(body),
            Err(err) => self.fail(ProbeError::Request(format!(
                "could not serialize request body: {err}"
            ))),
        }
        self
    }

    /// Uses `body` verbatim, whether or not it is valid JSON.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub async fn send(self) -> Result<ApiResponse> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let template = self.template;
        let mut url = template.url(&self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut headers = template.default_headers.clone();
        headers.extend(self.headers);

        template.notify_request(&RequestRecord {
            method: self.method.clone(),
            url: url.clone(),
            headers: header_pairs(&headers),
            body: self.body.clone(),
        });

        let mut request = template
            .http
            .request(self.method.clone(), url.clone())
            .headers(headers)
            .timeout(Duration::from_millis(template.options.timeout_ms));
        if let Some(body) = self.body {
            request = request.body(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(ProbeError::Transport)?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response.text().await.map_err(ProbeError::Transport)?;

        template.notify_response(&ResponseRecord {
            method: self.method,
            url,
            status,
            elapsed: started.elapsed(),
            body: body.clone(),
        });

        Ok(ApiResponse {
            status,
            headers: response_headers,
            body,
        })
    }

    fn fail(&mut self, err: ProbeError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|err| ProbeError::Request(format!("invalid header name '{name}': {err}")))?;
    let mut value = HeaderValue::from_str(value)
        .map_err(|err| ProbeError::Request(format!("invalid value for header '{name}': {err}")))?;
    if name == header::AUTHORIZATION {
        value.set_sensitive(true);
    }
    Ok((name, value))
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
