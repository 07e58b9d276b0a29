// ============================================
// File: crates/nucleon-server/src/services/listen.rs
// ============================================
//! # Listen Manager
//!
//! Owns the server's primary listen port and the set of external endpoints
//! (reverse tunnels) that route inbound traffic to it.

use std::sync::Arc;
use std::sync::RwLock;

use tracing::info;

use nucleon_tunnel::ExternalEndpoint;

/// Listen manager service.
pub struct ListenManager {
    primary_port: u16,
    external: RwLock<Vec<Arc<dyn ExternalEndpoint>>>,
}

impl ListenManager {
    /// Creates a listen manager for the given primary port.
    #[must_use]
    pub fn new(primary_port: u16) -> Self {
        Self {
            primary_port,
            external: RwLock::new(Vec::new()),
        }
    }

    /// Returns the primary listen port advertised during registration.
    #[must_use]
    pub fn primary_port(&self) -> u16 {
        self.primary_port
    }

    /// Registers an external endpoint so inbound traffic can be routed
    /// through it.
    pub fn add_external_server(&self, endpoint: Arc<dyn ExternalEndpoint>) {
        info!(endpoint = endpoint.name(), "Registered external endpoint");
        let mut external = self.external.write().unwrap_or_else(|e| e.into_inner());
        external.push(endpoint);
    }

    /// Returns the number of registered external endpoints.
    #[must_use]
    pub fn external_count(&self) -> usize {
        let external = self.external.read().unwrap_or_else(|e| e.into_inner());
        external.len()
    }
}

impl std::fmt::Debug for ListenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenManager")
            .field("primary_port", &self.primary_port)
            .field("external_count", &self.external_count())
            .finish()
    }
}
