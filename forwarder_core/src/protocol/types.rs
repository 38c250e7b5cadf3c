/**
 * Endpoint configuration for the result forwarder.
 *
 * An `EndpointConfig` names the collector a result is delivered to:
 * `{base_url}{path}`, optionally authenticated with a bearer token.
 * It is built by the caller right before use and never mutated by the
 * forwarder itself.
 */
use std::fmt;
use std::time::Duration;

use url::Url;

use super::constants::{
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_GLOBAL_TIMEOUT, DEFAULT_PATH,
};
use crate::error::ForwardError;

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

/// Per-request time limits applied by the HTTP transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum time to establish the TCP/TLS connection.
    pub connect: Duration,

    /// Maximum time for the whole request, response included.
    pub global: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            global: DEFAULT_GLOBAL_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// EndpointConfig
// ---------------------------------------------------------------------------

/**
 * Where and how a result payload is delivered.
 *
 * # Example
 * ```ignore
 * let config = EndpointConfig::new("http://collector:8080", "/api/results")
 *     .with_auth_token("s3cret");
 * assert_eq!(config.target_url()?, "http://collector:8080/api/results");
 * ```
 */
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Scheme, host and optional port, e.g. `http://localhost:3000`.
    pub base_url: String,

    /// Path appended verbatim to `base_url`, e.g. `/api/chat/results`.
    pub path: String,

    /// Bearer token. `None` and `Some("")` both mean "no Authorization header".
    pub auth_token: Option<String>,

    pub timeouts: Timeouts,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_PATH.to_string(),
            auth_token: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl EndpointConfig {
    /// Creates a config without a token and with default timeouts.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Returns the token to send as `Bearer`, or `None` when it is absent or empty.
    pub fn bearer(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|token| !token.is_empty())
    }

    /**
     * Joins `base_url` and `path` into the request URL.
     *
     * The two parts are concatenated as-is, except that a doubled slash at
     * the seam (`http://host/` + `/path`) collapses to one. The result must
     * parse as an absolute `http` or `https` URL.
     *
     * # Returns
     * * `Ok(String)` with the URL the POST is sent to.
     * * `Err(ForwardError::InvalidConfig)` if either part is empty or the
     *   joined URL is not a valid http(s) URL.
     */
    pub fn target_url(&self) -> Result<String, ForwardError> {
        if self.base_url.is_empty() {
            return Err(ForwardError::InvalidConfig("base URL is empty".into()));
        }
        if self.path.is_empty() {
            return Err(ForwardError::InvalidConfig("endpoint path is empty".into()));
        }

        let joined = match self.path.strip_prefix('/') {
            Some(rest) if self.base_url.ends_with('/') => format!("{}{rest}", self.base_url),
            _ => format!("{}{}", self.base_url, self.path),
        };

        let parsed = Url::parse(&joined).map_err(|e| {
            ForwardError::InvalidConfig(format!("invalid target URL `{joined}`: {e}"))
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(joined),
            other => Err(ForwardError::InvalidConfig(format!(
                "unsupported URL scheme `{other}`"
            ))),
        }
    }
}

/// Redacts the token so configs can be logged safely.
impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("auth_token", &self.bearer().map(|_| "<redacted>"))
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
