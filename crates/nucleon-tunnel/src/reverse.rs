// ============================================
// File: crates/nucleon-tunnel/src/reverse.rs
// ============================================
//! # Reverse Tunnel Implementation
//!
//! ## Creation Reason
//! Lets external clients reach the server through the authority's relay
//! without an inbound port being exposed: the server dials out to the relay
//! and authenticates the connection with a tunnel token.
//!
//! ## Main Functionality
//! - `ReverseTunnel`: outbound persistent TCP connection to a relay
//! - Token authentication as the first line of the stream
//! - Line-based keepalive (relay pings, tunnel pongs)
//! - Graceful shutdown support
//!
//! ## ⚠️ Important Note for Next Developer
//! - `listen` is fire-and-forget: connect failures are logged, never
//!   surfaced to the caller
//! - There is deliberately no reconnect loop; a dropped tunnel stays down
//!   until the process restarts
//!
//! ## Last Modified
//! v0.1.0 - Initial reverse tunnel implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::traits::ExternalEndpoint;

// ============================================
// ReverseTunnel
// ============================================

/// Outbound reverse tunnel to a relay.
///
/// # Lifecycle
/// 1. Create with `ReverseTunnel::new(relay_addr)`
/// 2. Start with `tunnel.listen(token)` (spawns the connection task)
/// 3. Register with the listen manager as an [`ExternalEndpoint`]
///
/// # Example
/// ```ignore
/// use nucleon_tunnel::ReverseTunnel;
///
/// let tunnel = ReverseTunnel::new("relay.nucleon.network:30130");
/// tunnel.listen("rp-token-from-registration");
/// ```
pub struct ReverseTunnel {
    /// Relay address in `host:port` form.
    relay_addr: String,
    /// Set once the token has been presented to the relay.
    connected: Arc<AtomicBool>,
    /// Shutdown flag.
    shutdown: Arc<AtomicBool>,
    /// Wakes the connection task on shutdown.
    notify: Arc<Notify>,
}

impl ReverseTunnel {
    /// Creates a new reverse tunnel targeting the given relay.
    ///
    /// No connection is made until [`listen`](Self::listen) is called.
    #[must_use]
    pub fn new(relay_addr: impl Into<String>) -> Self {
        Self {
            relay_addr: relay_addr.into(),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Connects to the relay and authenticates with `token`.
    ///
    /// Spawns the connection task and returns immediately. Connect and
    /// authentication failures are logged by the task; callers observe them
    /// only through [`is_active`](ExternalEndpoint::is_active) staying
    /// `false`.
    pub fn listen(&self, token: &str) {
        let relay_addr = self.relay_addr.clone();
        let token = token.to_string();
        let connected = Arc::clone(&self.connected);
        let shutdown = Arc::clone(&self.shutdown);
        let notify = Arc::clone(&self.notify);

        tokio::spawn(async move {
            run_connection(relay_addr, token, connected, shutdown, notify).await;
        });
    }

    /// Returns the relay address this tunnel targets.
    #[must_use]
    pub fn relay_addr(&self) -> &str {
        &self.relay_addr
    }
}

/// Connection task: dial, authenticate, then answer keepalives until the
/// relay closes the stream or shutdown is requested.
async fn run_connection(
    relay_addr: String,
    token: String,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    let stream = match TcpStream::connect(&relay_addr).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(relay = %relay_addr, "Reverse tunnel connect failed: {}", e);
            return;
        }
    };

    let (reader, mut writer) = stream.into_split();

    // First line authenticates the tunnel.
    if let Err(e) = writer.write_all(format!("{token}\n").as_bytes()).await {
        warn!(relay = %relay_addr, "Reverse tunnel authentication write failed: {}", e);
        return;
    }

    connected.store(true, Ordering::Release);
    info!(relay = %relay_addr, "Reverse tunnel established");

    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            _ = notify.notified() => {
                debug!("Reverse tunnel received shutdown signal");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(msg)) => {
                        if msg.trim() == "ping" {
                            if let Err(e) = writer.write_all(b"pong\n").await {
                                warn!("Reverse tunnel keepalive write failed: {}", e);
                                break;
                            }
                        } else {
                            trace!(len = msg.len(), "Ignoring relay control line");
                        }
                    }
                    Ok(None) => {
                        debug!(relay = %relay_addr, "Relay closed the tunnel");
                        break;
                    }
                    Err(e) => {
                        if !shutdown.load(Ordering::Acquire) {
                            warn!(relay = %relay_addr, "Reverse tunnel read error: {}", e);
                        }
                        break;
                    }
                }
            }
        }
    }

    connected.store(false, Ordering::Release);
    debug!("Reverse tunnel task exiting");
}

#[async_trait]
impl ExternalEndpoint for ReverseTunnel {
    fn name(&self) -> &str {
        "reverse-tunnel"
    }

    fn is_active(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.shutdown.load(Ordering::Acquire)
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.notify.notify_one();
        Ok(())
    }
}

impl std::fmt::Debug for ReverseTunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseTunnel")
            .field("relay_addr", &self.relay_addr)
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Polls until the tunnel reports active, or gives up.
    async fn wait_active(tunnel: &ReverseTunnel) -> bool {
        for _ in 0..100 {
            if tunnel.is_active() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_connect_and_authenticate() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let tunnel = ReverseTunnel::new(addr.to_string());
        tunnel.listen("secret-token");

        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let auth = lines.next_line().await.unwrap().unwrap();

        assert_eq!(auth, "secret-token");
        assert!(wait_active(&tunnel).await);
    }

    #[tokio::test]
    async fn test_keepalive_pong() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let tunnel = ReverseTunnel::new(addr.to_string());
        tunnel.listen("tok");

        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        // Consume the auth line, then ping.
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "tok");
        writer.write_all(b"ping\n").await.unwrap();

        let reply = lines.next_line().await.unwrap().unwrap();
        assert_eq!(reply, "pong");
    }

    #[tokio::test]
    async fn test_shutdown_closes_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let tunnel = ReverseTunnel::new(addr.to_string());
        tunnel.listen("tok");

        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "tok");
        assert!(wait_active(&tunnel).await);

        tunnel.shutdown().await.unwrap();
        assert!(!tunnel.is_active());

        // The task drops its write half, so the relay side sees EOF.
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connect_failure_stays_inactive() {
        // Bind then drop to obtain a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let tunnel = ReverseTunnel::new(addr.to_string());
        tunnel.listen("tok");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!tunnel.is_active());
    }
}
