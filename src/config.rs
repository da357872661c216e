use reqwest::Url;

use crate::{ProbeError, Result};

/// Environment variable holding the blog API base URL.
pub const API_BASE_URL_VAR: &str = "API_BASE_URL";

/// Environment variable holding the mock auth/user API base URL.
pub const AUTH_API_BASE_URL_VAR: &str = "AUTH_API_BASE_URL";

/// Validates a base URL.
///
/// Accepts absolute `http`/`https` URLs with a host. Surrounding whitespace
/// and trailing slashes are dropped so paths can be appended verbatim.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProbeError::Configuration("base URL is empty".to_owned()));
    }

    let url = Url::parse(trimmed.trim_end_matches('/'))
        .map_err(|err| ProbeError::Configuration(format!("invalid base URL '{trimmed}': {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProbeError::Configuration(format!(
            "unsupported scheme '{}' in base URL '{trimmed}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ProbeError::Configuration(format!("base URL '{trimmed}' has no host")));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ProbeError::Configuration(format!(
            "base URL '{trimmed}' must not carry a query or fragment"
        )));
    }

    Ok(url)
}

/// Reads and validates a base URL from the environment variable `name`.
pub fn base_url_from_env(name: &str) -> Result<Url> {
    let raw = std::env::var(name)
        .map_err(|_| ProbeError::Configuration(format!("missing {name} environment variable")))?;
    if raw.trim().is_empty() {
        return Err(ProbeError::Configuration(format!("{name} is set but empty")));
    }
    parse_base_url(&raw)
}

/// Appends `path` (optionally carrying a query string) to `base`.
///
/// Example: `https://host/api` + `/users?page=1` → `https://host/api/users?page=1`
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim();
    let joined = if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{}", path.trim_start_matches('/'))
    };
    Url::parse(&joined)
        .map_err(|err| ProbeError::Request(format!("invalid request URL '{joined}': {err}")))
}
