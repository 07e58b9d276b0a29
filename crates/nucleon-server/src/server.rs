// ============================================
// File: crates/nucleon-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Wires the collaborators together and drives the registration controller
//! from the application heartbeat until shutdown.
//!
//! ## Main Functionality
//! - Variable store seeding from configuration
//! - Component wiring (listen manager, event bus, licensing, HTTP client)
//! - The heartbeat loop: one `tokio::select!` over the tick interval, the
//!   completion queue, and the shutdown signal
//! - Graceful Ctrl+C shutdown
//!
//! ## ⚠️ Important Note for Next Developer
//! - The controller's state is unsynchronized on purpose: ticks and
//!   completions are both handled on this loop, never concurrently. Do not
//!   hand the controller to another task.
//!
//! ## Last Modified
//! v0.1.0 - Initial orchestrator implementation

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::nucleus::{HttpRegistrationApi, NoticeEngine, NucleusController, RegistrationApi};
use crate::services::licensing::{KeyDerivedLicensing, Licensing};
use crate::services::vars::{
    VarFlags, VarStore, HOSTNAME_VAR, IP_OVERRIDE_VAR, LICENSE_KEY_TOKEN_VAR, PROJECT_DESC_VAR,
    PROJECT_NAME_VAR, VERSION_VAR,
};
use crate::services::{EventBus, ListenManager};

/// Build version identifier seeded into the `version` variable.
const VERSION_STRING: &str = concat!("v", env!("CARGO_PKG_VERSION"));

// ============================================
// Server
// ============================================

/// Main Nucleon server.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Start with `server.run().await`
/// 3. Shutdown via Ctrl+C or [`shutdown`](Self::shutdown)
pub struct Server {
    /// Server configuration.
    config: ServerConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server instance.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown_tx,
        }
    }

    /// Runs the server until shutdown.
    ///
    /// # Errors
    /// Returns error if a component fails to initialize. Registration
    /// failures are never fatal; they are absorbed by the controller's
    /// backoff.
    pub async fn run(&self) -> Result<()> {
        info!("Starting Nucleon server {}", VERSION_STRING);

        let vars = Arc::new(VarStore::new());
        self.seed_vars(&vars)?;

        let listen = Arc::new(ListenManager::new(self.config.network.primary_port));
        let events = Arc::new(EventBus::default());
        let licensing: Arc<dyn Licensing> = Arc::new(KeyDerivedLicensing::new());
        let api: Arc<dyn RegistrationApi> =
            Arc::new(HttpRegistrationApi::new(&self.config.nucleus)?);

        let (completion_tx, mut completion_rx) = mpsc::channel(8);
        let mut controller = NucleusController::new(
            Arc::clone(&vars),
            licensing,
            Arc::clone(&listen),
            Arc::clone(&events),
            api,
            NoticeEngine::with_builtin_notices(),
            self.config.nucleus.relay_addr.clone(),
            completion_tx,
        );

        self.spawn_signal_task();

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut heartbeat =
            tokio::time::interval(Duration::from_millis(self.config.nucleus.tick_interval_ms));

        info!(
            port = self.config.network.primary_port,
            "Server started successfully"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }
                _ = heartbeat.tick() => {
                    controller.on_tick(Instant::now());
                }
                Some(outcome) = completion_rx.recv() => {
                    controller.on_completion(Instant::now(), outcome);
                }
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Seeds the variable store from configuration.
    fn seed_vars(&self, vars: &VarStore) -> Result<()> {
        let identity = &self.config.identity;

        vars.register(
            LICENSE_KEY_TOKEN_VAR,
            &identity.license_key_token,
            VarFlags::None,
        )?;
        vars.register(PROJECT_NAME_VAR, &identity.project_name, VarFlags::None)?;
        vars.register(PROJECT_DESC_VAR, &identity.project_desc, VarFlags::None)?;
        vars.register(HOSTNAME_VAR, &identity.hostname, VarFlags::None)?;
        vars.register(
            IP_OVERRIDE_VAR,
            &self.config.network.ip_override,
            VarFlags::None,
        )?;
        vars.register(VERSION_VAR, VERSION_STRING, VarFlags::None)?;

        debug!("Variable store seeded");
        Ok(())
    }

    /// Forwards Ctrl+C to the shutdown channel.
    fn spawn_signal_task(&self) {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received shutdown signal");
                    let _ = shutdown_tx.send(());
                }
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        });
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("primary_port", &self.config.network.primary_port)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::vars::WEB_BASE_URL_VAR;

    #[test]
    fn test_seed_vars_from_config() {
        let config = ServerConfig::from_str(
            r#"
            [identity]
            license_key_token = "lk-abc"
            project_name = "MyServer"

            [network]
            ip_override = "1.2.3.4"
            "#,
        )
        .unwrap();

        let server = Server::new(config);
        let vars = VarStore::new();
        server.seed_vars(&vars).unwrap();

        assert_eq!(
            vars.find(LICENSE_KEY_TOKEN_VAR),
            Some("lk-abc".to_string())
        );
        assert_eq!(vars.find(PROJECT_NAME_VAR), Some("MyServer".to_string()));
        assert_eq!(vars.find(IP_OVERRIDE_VAR), Some("1.2.3.4".to_string()));
        assert!(vars.find(VERSION_VAR).is_some_and(|v| v.starts_with('v')));

        // Published only after registration succeeds.
        assert_eq!(vars.find(WEB_BASE_URL_VAR), None);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let server = Arc::new(Server::new(ServerConfig::default()));

        let runner = Arc::clone(&server);
        let handle = tokio::spawn(async move { runner.run().await });

        // Let the loop start, then ask it to stop.
        tokio::time::sleep(Duration::from_millis(50)).await;
        server.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not shut down")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}
