/*!
 * Endpoint settings for the result forwarder.
 *
 * Layers, lowest precedence first:
 * 1. built-in defaults (`http://localhost:3000` + `/api/chat/results`),
 * 2. an optional TOML file,
 * 3. `RESULT_FORWARDER_*` environment variables.
 *
 * ```toml
 * base_url = "https://collector.internal"
 * path = "/api/results"
 * auth_token = "s3cret"
 * connect_timeout_ms = 2000
 * timeout_ms = 10000
 * ```
 */

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as RConfig, Environment, File, FileFormat};
use forwarder_core::{
    EndpointConfig, Timeouts, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_GLOBAL_TIMEOUT,
    DEFAULT_PATH,
};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "RESULT_FORWARDER";

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub path: String,
    pub auth_token: Option<String>,
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
}

impl From<Settings> for EndpointConfig {
    fn from(settings: Settings) -> Self {
        let config = EndpointConfig::new(settings.base_url, settings.path).with_timeouts(Timeouts {
            connect: Duration::from_millis(settings.connect_timeout_ms),
            global: Duration::from_millis(settings.timeout_ms),
        });

        match settings.auth_token {
            Some(token) => config.with_auth_token(token),
            None => config,
        }
    }
}

/// Reads the layered settings. A `file` that does not exist is an error.
pub fn load_settings(file: Option<&Path>) -> Result<Settings> {
    let mut builder = RConfig::builder()
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("path", DEFAULT_PATH)?
        .set_default("connect_timeout_ms", DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)?
        .set_default("timeout_ms", DEFAULT_GLOBAL_TIMEOUT.as_millis() as u64)?;

    if let Some(file) = file {
        builder = builder.add_source(File::from(file).format(FileFormat::Toml).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

    builder
        .build()
        .context("failed to read forwarder settings")?
        .try_deserialize()
        .context("failed to parse forwarder settings")
}

/// Loads settings and turns them into an `EndpointConfig`.
pub fn load(file: Option<&Path>) -> Result<EndpointConfig> {
    Ok(load_settings(file)?.into())
}
