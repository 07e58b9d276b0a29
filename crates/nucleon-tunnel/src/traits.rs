// ============================================
// File: crates/nucleon-tunnel/src/traits.rs
// ============================================
//! # Tunnel Traits
//!
//! Defines the seam between tunnel transports and the listen manager that
//! routes inbound traffic through them. Traits enable mock implementations
//! for testing.

use async_trait::async_trait;

use crate::error::Result;

/// An externally reachable endpoint registered with the listen manager.
///
/// # Purpose
/// The listen manager treats reverse tunnels and locally bound listeners
/// uniformly: anything that can accept traffic on the server's behalf is an
/// external endpoint.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to allow sharing across async
/// tasks.
#[async_trait]
pub trait ExternalEndpoint: Send + Sync {
    /// Returns a short human-readable name for this endpoint.
    fn name(&self) -> &str;

    /// Returns `true` if the endpoint is connected and accepting traffic.
    fn is_active(&self) -> bool;

    /// Gracefully shuts down the endpoint.
    ///
    /// After shutdown, [`is_active`](Self::is_active) returns `false`.
    ///
    /// # Errors
    /// Returns error if shutdown fails.
    async fn shutdown(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEndpoint;

    #[async_trait]
    impl ExternalEndpoint for StubEndpoint {
        fn name(&self) -> &str {
            "stub"
        }

        fn is_active(&self) -> bool {
            true
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_trait_object() {
        let endpoint: Box<dyn ExternalEndpoint> = Box::new(StubEndpoint);
        assert_eq!(endpoint.name(), "stub");
        assert!(endpoint.is_active());
        endpoint.shutdown().await.unwrap();
    }
}
