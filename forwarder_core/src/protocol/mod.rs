/*!
 * Protocol layer — where results go and what the request looks like.
 *
 * - `types` — EndpointConfig, Timeouts
 * - `constants` — default endpoint, timeouts, header values
 */

pub mod constants;
pub mod types;
