/**
 * Defaults baked into every `EndpointConfig` and the delivery pipeline.
 */
use std::time::Duration;

/// Collector base URL used when the caller does not provide one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Path appended to the base URL when the caller does not provide one.
pub const DEFAULT_PATH: &str = "/api/chat/results";

/// Connect timeout for a single delivery attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total time budget for a single delivery attempt, response included.
pub const DEFAULT_GLOBAL_TIMEOUT: Duration = Duration::from_secs(30);

/// The only status code that counts as a successful delivery.
pub const SUCCESS_STATUS: u16 = 200;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("result-forwarder/", env!("CARGO_PKG_VERSION"));
