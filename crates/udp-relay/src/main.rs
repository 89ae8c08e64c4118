//! `udp-relay`: receiving side of the telemetry link.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`](config::Config) from the YAML file and environment.
//! 2. Initialise structured JSON logging.
//! 3. Decode the shared key into a frame codec.
//! 4. Bind every route and relay decrypted frames until a route fails.

mod config;
mod relay;
mod telemetry;

use std::sync::Arc;

use anyhow::Result;
use telecrypt::FrameCodec;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: udp-relay configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        routes = cfg.destinations.len(),
        "udp-relay starting"
    );

    // -----------------------------------------------------------------------
    // 3. Codec
    // -----------------------------------------------------------------------
    let codec = Arc::new(FrameCodec::new(cfg.chacha_key.decode()?));

    // -----------------------------------------------------------------------
    // 4. Relay
    // -----------------------------------------------------------------------
    relay::run(&cfg, codec).await
}
