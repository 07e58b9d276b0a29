// ============================================
// File: crates/nucleon-tunnel/src/error.rs
// ============================================
//! # Tunnel Error Types

use std::io;

use thiserror::Error;

/// Result type for tunnel operations.
pub type Result<T> = std::result::Result<T, TunnelError>;

/// Tunnel transport error types.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Relay address could not be parsed or resolved.
    #[error("Invalid relay address: {addr}")]
    InvalidAddress {
        /// The invalid address string
        addr: String,
    },

    /// Outbound connection to the relay failed.
    #[error("Failed to connect to relay {addr}: {reason}")]
    ConnectFailed {
        /// Relay address we tried to reach
        addr: String,
        /// Why the connection failed
        reason: String,
    },

    /// The relay rejected the tunnel token.
    #[error("Relay rejected tunnel token: {reason}")]
    AuthRejected {
        /// Rejection detail reported by the relay
        reason: String,
    },

    /// Tunnel is shutting down.
    #[error("Tunnel is shutting down")]
    ShuttingDown,

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TunnelError {
    /// Creates a `ConnectFailed` error.
    pub fn connect_failed(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectFailed {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectFailed { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}
