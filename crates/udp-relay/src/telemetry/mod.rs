//! Telemetry initialisation for the UDP relay.
//!
//! Structured JSON logs to stdout. `RUST_LOG` takes precedence over the
//! configured level.
//!
//! Log fields carry addresses, byte counts and error codes. Key material is
//! never logged; decrypted payloads only appear at `debug`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber for the relay.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise udp-relay tracing subscriber: {e}"))
}
