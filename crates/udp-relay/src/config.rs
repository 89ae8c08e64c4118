//! Configuration loading and validation for the UDP relay.
//!
//! Values come from a YAML file (path in `RELAY_CONFIG`, default
//! `relay.yaml`). Top-level scalars can be overridden with `RELAY_<FIELD>`
//! environment variables, e.g. `RELAY_CHACHA_KEY` or `RELAY_LOG_LEVEL`.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use anyhow::{Context, Result};
use serde::Deserialize;
use telecrypt::FrameKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "RELAY_CONFIG";

const ENV_PREFIX: &str = "RELAY";

/// Validated relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Shared ChaCha20-Poly1305 key as 64 hex characters. **Required.**
    pub chacha_key: HexKey,

    /// One entry per listening port. **Required**, at least one.
    pub destinations: Vec<Destination>,

    /// Local address every route binds its listening socket to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// Receive buffer size; longer datagrams are truncated by the OS and then
    /// fail authentication.
    #[serde(default = "default_max_datagram_len")]
    pub max_datagram_len: usize,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// A route: frames received on `listen_port` are decrypted and forwarded to
/// `address:port`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Destination {
    pub listen_port: u16,
    pub address: String,
    pub port: u16,
}

impl Destination {
    /// `address:port` of the forward target.
    pub fn target(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// The configured key in its hex form. Zeroized on drop; never printed.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct HexKey(String);

impl HexKey {
    /// Decode into the binary key used by the codec.
    pub fn decode(&self) -> Result<FrameKey> {
        FrameKey::from_hex(&self.0).context("CHACHA_KEY is not a valid 256-bit hex key")
    }
}

impl From<&str> for HexKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Debug for HexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("HexKey([REDACTED])")
    }
}

fn default_bind_addr() -> IpAddr {
    IpAddr::from([0u8, 0, 0, 0])
}
fn default_max_datagram_len() -> usize {
    // Standard Ethernet MTU.
    1500
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load the file named by [`CONFIG_PATH_VAR`] and apply environment
    /// overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "relay.yaml".into());
        Self::load(&path)
    }

    /// Load and validate configuration from the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed, or if any value
    /// fails validation.
    pub fn load(path: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Yaml))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to build relay configuration from {path}"))?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise relay configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        self.chacha_key.decode()?;

        if self.destinations.is_empty() {
            anyhow::bail!("DESTINATIONS must list at least one route");
        }
        if self.max_datagram_len < telecrypt::MIN_FRAME_LEN {
            anyhow::bail!(
                "MAX_DATAGRAM_LEN must be at least {} bytes",
                telecrypt::MIN_FRAME_LEN
            );
        }

        let mut ports = HashSet::new();
        for dest in &self.destinations {
            if dest.listen_port == 0 {
                anyhow::bail!("destination listen_port must be non-zero");
            }
            if dest.address.trim().is_empty() || dest.port == 0 {
                anyhow::bail!("invalid destination for port {}", dest.listen_port);
            }
            if !ports.insert(dest.listen_port) {
                anyhow::bail!("listen_port {} is configured twice", dest.listen_port);
            }
        }
        Ok(())
    }
}
