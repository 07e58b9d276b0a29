// ============================================
// File: crates/nucleon-server/src/error.rs
// ============================================
//! # Server Error Types

use thiserror::Error;

use nucleon_tunnel::TunnelError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path to the configuration file
        path: String,
        /// Why loading failed
        reason: String,
    },

    /// Configuration field failed validation.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Configuration field name
        field: String,
        /// Why it is invalid
        reason: String,
    },

    /// Attempted write to a read-only console variable.
    #[error("Console variable '{name}' is read-only")]
    VarReadOnly {
        /// Variable name
        name: String,
    },

    /// Console variable is already registered.
    #[error("Console variable '{name}' is already registered")]
    VarExists {
        /// Variable name
        name: String,
    },

    /// Registration request against the Nucleus endpoint failed.
    #[error("Registration failed: {reason}")]
    Registration {
        /// Why the attempt failed
        reason: String,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong
        message: String,
    },

    /// Error from the tunnel transport.
    #[error(transparent)]
    Tunnel(#[from] TunnelError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Registration` error.
    pub fn registration(reason: impl Into<String>) -> Self {
        Self::Registration {
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if this error should abort startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if the failed operation may succeed when retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Registration { .. } => true,
            Self::Tunnel(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::config_load("/etc/nucleon/server.toml", "file not found");
        assert!(err.to_string().contains("/etc/nucleon/server.toml"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = ServerError::config_invalid("primary_port", "must be > 0");
        assert!(config_err.is_config_error());
        assert!(config_err.is_fatal());
        assert!(!config_err.is_retryable());

        let reg_err = ServerError::registration("endpoint unreachable");
        assert!(reg_err.is_retryable());
        assert!(!reg_err.is_fatal());
    }
}
