// ============================================
// File: crates/nucleon-server/src/services/licensing.rs
// ============================================
//! # Licensing Service
//!
//! ## Creation Reason
//! Derives the short-lived Nucleus credential from the locally configured
//! license token. The registration controller never sends the raw license
//! token over the wire.
//!
//! ## Main Functionality
//! - `Licensing`: collaborator trait consumed by the controller
//! - `KeyDerivedLicensing`: production implementation deriving
//!   `hex(sha256(context || token))`
//!
//! ## Last Modified
//! v0.1.0 - Initial licensing service

use sha2::{Digest, Sha256};

/// Domain separation context mixed into the credential derivation.
const NUCLEUS_TOKEN_CONTEXT: &[u8] = b"nucleon-registration-v1";

/// Produces the derived authentication credential ("nucleus token") for a
/// raw license token.
///
/// Returning `None` means no credential is currently derivable; the
/// controller defers the attempt to a later tick without treating it as an
/// error.
pub trait Licensing: Send + Sync {
    /// Derives the Nucleus credential from the raw license token.
    fn nucleus_token(&self, license_token: &str) -> Option<String>;
}

/// Production licensing implementation.
#[derive(Debug, Default)]
pub struct KeyDerivedLicensing;

impl KeyDerivedLicensing {
    /// Creates the licensing service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Licensing for KeyDerivedLicensing {
    fn nucleus_token(&self, license_token: &str) -> Option<String> {
        if license_token.is_empty() {
            return None;
        }

        let mut hasher = Sha256::new();
        hasher.update(NUCLEUS_TOKEN_CONTEXT);
        hasher.update(license_token.as_bytes());
        Some(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_yields_no_credential() {
        let licensing = KeyDerivedLicensing::new();
        assert_eq!(licensing.nucleus_token(""), None);
    }

    #[test]
    fn test_derivation_is_stable() {
        let licensing = KeyDerivedLicensing::new();

        let a = licensing.nucleus_token("lk-abc").unwrap();
        let b = licensing.nucleus_token("lk-abc").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        // Different tokens derive different credentials.
        let c = licensing.nucleus_token("lk-def").unwrap();
        assert_ne!(a, c);
    }
}
