/*!
 * Forwarder Core — delivers computed results to a remote collector.
 *
 * A result is any `serde::Serialize` value. It is serialized to JSON and
 * POSTed to `{base_url}{path}` with `Content-Type: application/json` and,
 * when a token is configured, `Authorization: Bearer <token>`. Delivery
 * succeeds only if the collector answers HTTP 200.
 *
 * # Module structure
 *
 * - `protocol/` — where results go: EndpointConfig, Timeouts, defaults
 * - `transport/` — how they get there: HTTP client, background worker
 * - `dispatcher` — queued, non-blocking forwarding with flush-on-drop
 * - `error` — ForwardError
 *
 * # Example
 * ```ignore
 * let config = forwarder_core::EndpointConfig::default().with_auth_token("s3cret");
 * if !forwarder_core::send(&config, &serde_json::json!({"ok": true})) {
 *     eprintln!("Failed to forward request");
 * }
 * ```
 */

mod dispatcher;
mod error;
mod protocol;
mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use dispatcher::{
    BeforeSend, DispatchOptions, DispatchStats, Dispatcher, DEFAULT_FLUSH_TIMEOUT,
    DEFAULT_QUEUE_CAPACITY,
};
pub use error::ForwardError;
pub use protocol::constants::{
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_GLOBAL_TIMEOUT, DEFAULT_PATH,
};
pub use protocol::types::{EndpointConfig, Timeouts};

use serde::Serialize;
use transport::Transport;

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/**
 * Forwards `payload` to the configured endpoint and reports whether the
 * collector accepted it.
 *
 * Blocks until the collector answers or the configured timeout elapses.
 * Builds a fresh HTTP agent for this call and makes exactly one attempt.
 *
 * Returns `true` iff the collector responded with HTTP 200. Every other
 * outcome (other status, no response, invalid config, unserializable
 * payload) is `false`. Never panics.
 */
pub fn send<T: Serialize + ?Sized>(config: &EndpointConfig, payload: &T) -> bool {
    try_send(config, payload).is_ok()
}

/**
 * Same request as `send`, but returns why delivery failed.
 *
 * # Errors
 * * `ForwardError::InvalidConfig` — empty or malformed base URL / path.
 * * `ForwardError::Serialize` — the payload could not be turned into JSON.
 * * `ForwardError::Transport` — no response (refused, DNS, TLS, timeout).
 * * `ForwardError::Status` — the collector answered with a non-200 status.
 */
pub fn try_send<T: Serialize + ?Sized>(
    config: &EndpointConfig,
    payload: &T,
) -> Result<(), ForwardError> {
    let url = config.target_url()?;
    let body = serde_json::to_string(payload)?;

    let outcome = Transport::new(&config.timeouts).deliver(&url, config.bearer(), &body);

    match &outcome {
        Ok(()) => tracing::debug!(url = %url, bytes = body.len(), "result forwarded"),
        Err(err) => tracing::warn!(url = %url, error = %err, "failed to forward result"),
    }

    outcome
}
