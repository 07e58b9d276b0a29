// ============================================
// File: crates/nucleon-server/src/nucleus/client.rs
// ============================================
//! # Registration API Client

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::NucleusConfig;
use crate::error::{Result, ServerError};
use crate::nucleus::models::RegistrationRequest;

/// Asynchronous registration transport.
///
/// Issues the registration POST and returns the raw response body bytes on
/// success. Implemented over reqwest in production; tests substitute
/// scripted implementations.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    /// Sends the registration request and returns the raw response body.
    ///
    /// # Errors
    /// Returns [`ServerError::Registration`] for any transport or HTTP
    /// failure.
    async fn register(&self, request: &RegistrationRequest) -> Result<Vec<u8>>;
}

/// HTTP registration client over reqwest.
pub struct HttpRegistrationApi {
    http: reqwest::Client,
    register_url: String,
}

impl HttpRegistrationApi {
    /// Creates the client from the Nucleus configuration.
    ///
    /// The registration endpoint requires IPv4, so the client binds its
    /// local address to `0.0.0.0`.
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &NucleusConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .build()
            .map_err(|e| ServerError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            register_url: config.register_url.clone(),
        })
    }
}

#[async_trait]
impl RegistrationApi for HttpRegistrationApi {
    async fn register(&self, request: &RegistrationRequest) -> Result<Vec<u8>> {
        debug!(url = %self.register_url, "Issuing registration request");

        let response = self
            .http
            .post(&self.register_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ServerError::registration(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ServerError::registration(format!(
                "endpoint returned status {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServerError::registration(format!("failed to read body: {e}")))?;

        Ok(body.to_vec())
    }
}

impl std::fmt::Debug for HttpRegistrationApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistrationApi")
            .field("register_url", &self.register_url)
            .finish()
    }
}
