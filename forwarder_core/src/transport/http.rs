/*!
 * HTTP transport for delivering result payloads to the collector.
 *
 * Uses `ureq`, a pure-Rust blocking HTTP client with no async runtime.
 * Callers of `send` block until the collector answers, and the dispatcher
 * worker is a dedicated thread, so blocking I/O fits both.
 *
 * One delivery is exactly one POST. There are no retries; whether to try
 * again is left to the caller, who gets the cause in `ForwardError`.
 */

use ureq::Agent;

use crate::error::ForwardError;
use crate::protocol::constants::{CONTENT_TYPE_JSON, SUCCESS_STATUS, USER_AGENT};
use crate::protocol::types::Timeouts;

/**
 * Thin wrapper around `ureq::Agent`.
 *
 * `send` builds a fresh `Transport` per call. The dispatcher builds one
 * when it starts and moves it into its worker thread, so pooled
 * connections are reused across deliveries there.
 */
pub struct Transport {
    agent: Agent,
}

impl Transport {
    /**
     * Creates a transport whose agent applies the given timeouts.
     *
     * Non-2xx statuses are returned as responses rather than errors, so
     * the status check below sees every reply the collector sends.
     */
    pub fn new(timeouts: &Timeouts) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_connect(Some(timeouts.connect))
            .timeout_global(Some(timeouts.global))
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent }
    }

    /**
     * POSTs an already serialized JSON body to `url`.
     *
     * Headers: `Content-Type: application/json`, plus
     * `Authorization: Bearer <token>` when `bearer` is `Some`.
     *
     * # Returns
     * * `Ok(())` if the collector answered with exactly HTTP 200.
     * * `Err(ForwardError::Status)` for any other status.
     * * `Err(ForwardError::Transport)` if no response was received
     *   (refused, DNS, TLS, timeout).
     */
    pub fn deliver(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &str,
    ) -> Result<(), ForwardError> {
        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", CONTENT_TYPE_JSON)
            .header("User-Agent", USER_AGENT);

        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send(body)?;
        let status = response.status().as_u16();

        if status == SUCCESS_STATUS {
            return Ok(());
        }

        let reply = response
            .into_body()
            .read_to_string()
            .unwrap_or_else(|_| "<unreadable body>".into());

        Err(ForwardError::Status {
            status,
            body: reply,
        })
    }
}
