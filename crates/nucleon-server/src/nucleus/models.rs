// ============================================
// File: crates/nucleon-server/src/nucleus/models.rs
// ============================================
//! # Nucleus Wire Models
//!
//! Request/response payloads for the registration endpoint, plus the
//! backoff policy governing retry cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

// ============================================
// RegistrationRequest
// ============================================

/// Registration request sent to the Nucleus endpoint.
///
/// Constructed fresh per attempt; immutable once sent.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    /// Derived authentication credential (never the raw license token).
    pub token: String,
    /// Primary listen port, as a decimal string per the wire contract.
    pub port: String,
    /// Advertised IP override; empty lets the endpoint derive it.
    #[serde(rename = "ipOverride")]
    pub ip_override: String,
}

// ============================================
// RegistrationResponse
// ============================================

/// Registration response returned by the Nucleus endpoint.
///
/// Absent fields default to empty strings; completeness is checked with
/// [`is_complete`](Self::is_complete) before the response is acted on.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    /// Assigned public host.
    #[serde(default)]
    pub host: String,
    /// Token authenticating the reverse tunnel at the relay.
    #[serde(default, rename = "rpToken")]
    pub rp_token: String,
}

impl RegistrationResponse {
    /// Parses a response from raw body bytes.
    ///
    /// # Errors
    /// Returns [`ServerError::Registration`] if the body is not valid JSON.
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| ServerError::registration(format!("unparsable response body: {e}")))
    }

    /// Returns `true` if both fields required to act on the response are
    /// present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.host.is_empty() && !self.rp_token.is_empty()
    }

    /// Returns the externally reachable base URL for the assigned host.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}/", self.host)
    }
}

// ============================================
// BackoffPolicy
// ============================================

/// Exponential backoff between registration attempts.
///
/// Starts at 15 seconds, doubles on each failure, capped at 15 minutes.
/// Monotonic for the lifetime of the process: the value never resets once
/// increased. Retries stop entirely on permanent success, so no reset path
/// exists.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    current: Duration,
}

impl BackoffPolicy {
    /// Initial backoff window.
    pub const INITIAL: Duration = Duration::from_secs(15);

    /// Backoff ceiling.
    pub const CEILING: Duration = Duration::from_secs(15 * 60);

    /// Creates a policy at the initial window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Self::INITIAL,
        }
    }

    /// Returns the backoff window currently in effect.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Doubles the window, capped at the ceiling. Called on failure only.
    pub fn advance(&mut self) {
        self.current = (self.current * 2).min(Self::CEILING);
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Tests
// ============================================
