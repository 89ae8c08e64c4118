//! UDP decrypt-and-forward routes.
//!
//! For each configured destination the relay:
//! 1. Binds a UDP socket on `bind_addr:listen_port`.
//! 2. Opens a forward socket connected to `address:port`.
//! 3. Receives datagrams and handles each one on its own Tokio task: verify
//!    and decrypt the frame, then send the plaintext to the destination.
//!
//! Frames that fail verification are dropped. Nothing is ever sent back to
//! the device.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use telecrypt::FrameCodec;
use tokio::net::{lookup_host, UdpSocket};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{Config, Destination};

/// Bind every configured route and relay frames until one of them fails.
///
/// # Errors
///
/// Returns an error if a socket cannot be bound, a destination cannot be
/// resolved, or a route task terminates.
pub async fn run(cfg: &Config, codec: Arc<FrameCodec>) -> Result<()> {
    let mut routes = JoinSet::new();
    for dest in &cfg.destinations {
        let route = Route::bind(cfg.bind_addr, dest).await?;
        let addr = route.local_addr()?;
        info!(%addr, dest = %route.target, "relay listening");
        routes.spawn(route.serve(codec.clone(), cfg.max_datagram_len));
    }

    while let Some(joined) = routes.join_next().await {
        joined.context("route task panicked")??;
    }
    Ok(())
}

/// One listening socket paired with its forward socket.
pub struct Route {
    listener: UdpSocket,
    forward: Arc<UdpSocket>,
    target: Arc<str>,
}

impl Route {
    /// Bind the listening socket and connect the forward socket for `dest`.
    pub async fn bind(bind_addr: IpAddr, dest: &Destination) -> Result<Self> {
        let target = dest.target();
        let listener = UdpSocket::bind((bind_addr, dest.listen_port))
            .await
            .with_context(|| format!("failed to bind UDP port {}", dest.listen_port))?;

        let target_addr = lookup_host(target.as_str())
            .await
            .with_context(|| format!("failed to resolve forward address {target}"))?
            .next()
            .with_context(|| format!("forward address {target} resolved to nothing"))?;
        let forward = UdpSocket::bind(unspecified_for(&target_addr))
            .await
            .context("failed to bind forward socket")?;
        forward
            .connect(target_addr)
            .await
            .with_context(|| format!("failed to connect forward socket to {target}"))?;

        Ok(Self {
            listener,
            forward: Arc::new(forward),
            target: target.into(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Receive loop. Runs until the process is killed; receive errors are
    /// logged and the loop continues.
    pub async fn serve(self, codec: Arc<FrameCodec>, max_datagram_len: usize) -> Result<()> {
        let mut buf = vec![0u8; max_datagram_len];
        loop {
            match self.listener.recv_from(&mut buf).await {
                Ok((n, peer)) => {
                    let frame = Bytes::copy_from_slice(&buf[..n]);
                    let codec = codec.clone();
                    let forward = self.forward.clone();
                    let target = self.target.clone();
                    tokio::spawn(async move {
                        relay_frame(frame, peer, &codec, &forward, &target).await;
                    });
                }
                Err(e) => {
                    error!(dest = %self.target, error = %e, "receive error");
                }
            }
        }
    }
}

fn unspecified_for(addr: &SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

/// Verify, decrypt and forward a single datagram.
async fn relay_frame(
    frame: Bytes,
    peer: SocketAddr,
    codec: &FrameCodec,
    forward: &UdpSocket,
    target: &str,
) {
    let plaintext = match codec.decrypt(&frame) {
        Ok(plaintext) => plaintext,
        Err(e) => {
            info!(%peer, dest = target, code = e.code(), frame_len = frame.len(), "frame dropped");
            return;
        }
    };

    match forward.send(&plaintext).await {
        Ok(_) => {
            info!(%peer, dest = target, bytes = plaintext.len(), "frame forwarded");
            debug!(%peer, dest = target, payload = %String::from_utf8_lossy(&plaintext), "forwarded payload");
        }
        Err(e) => {
            warn!(%peer, dest = target, error = %e, "forward failed");
        }
    }
}
