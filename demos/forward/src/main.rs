/**
 * Command-line harness for the result forwarder.
 *
 * Forwards one JSON document and prints the reply a completion handler
 * would give its own client:
 *
 *   cargo run -p forward_demo -- '{"ok": true}'
 *   echo '{"ok": true}' | cargo run -p forward_demo -- --token s3cret
 *   cargo run -p forward_demo -- --config forwarder.toml --queued '{"ok": true}'
 *
 * Set `RUST_LOG=debug` to see delivery logs on stderr.
 */
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use forwarder_core::{DispatchOptions, Dispatcher, EndpointConfig};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forward", about = "Forward a JSON result to a collector endpoint")]
struct Args {
    /// TOML settings file (base_url, path, auth_token, connect_timeout_ms, timeout_ms).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides the configured endpoint path.
    #[arg(long)]
    path: Option<String>,

    /// Bearer token; an empty string disables the Authorization header.
    #[arg(long)]
    token: Option<String>,

    /// Deliver through a background dispatcher instead of a blocking send.
    #[arg(long)]
    queued: bool,

    /// JSON payload. Read from stdin when omitted.
    payload: Option<String>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(forwarded) => {
            let (body, code) = reply(forwarded);
            println!("{body}");
            ExitCode::from(code)
        }
        Err(err) => {
            eprintln!("[forward] {err:#}");
            ExitCode::from(2)
        }
    }
}

/// The body and exit code a completion handler hands back to its own client.
fn reply(forwarded: bool) -> (Value, u8) {
    if forwarded {
        (json!({"status": "processing"}), 0)
    } else {
        (json!({"error": "Failed to forward request"}), 1)
    }
}

fn run(args: Args) -> Result<bool> {
    let config = endpoint_config(&args)?;
    let payload = read_payload(args.payload.as_deref())?;

    tracing::debug!(?config, "forwarding result");

    if !args.queued {
        return Ok(forwarder_core::send(&config, &payload));
    }

    let dispatcher = Dispatcher::start(&config, DispatchOptions::default())
        .context("failed to start dispatcher")?;
    let queued = dispatcher.submit(&payload);
    let flushed = dispatcher.flush();

    Ok(queued && flushed && dispatcher.stats().delivered == 1)
}

fn endpoint_config(args: &Args) -> Result<EndpointConfig> {
    let mut config = forwarder_settings::load(args.config.as_deref())?;

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(path) = &args.path {
        config.path = path.clone();
    }
    if let Some(token) = &args.token {
        config.auth_token = Some(token.clone());
    }

    Ok(config)
}

fn read_payload(arg: Option<&str>) -> Result<Value> {
    let raw = match arg {
        Some(raw) => raw.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read payload from stdin")?;
            buf
        }
    };

    serde_json::from_str(&raw).context("payload is not valid JSON")
}
