// ============================================
// File: crates/nucleon-server/src/services/vars.rs
// ============================================
//! # Console Variable Store
//!
//! ## Creation Reason
//! Typed key-value store for server configuration, queried by name at
//! runtime by the registration controller and the notice engine.
//!
//! ## Main Functionality
//! - `VarStore`: thread-safe string variable store
//! - `VarFlags`: per-entry flags (read-only enforcement)
//! - Well-known variable name constants
//!
//! ## Last Modified
//! v0.1.0 - Initial variable store

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, ServerError};

// ============================================
// Well-known variable names
// ============================================

/// License token identifying the server to the licensing system.
pub const LICENSE_KEY_TOKEN_VAR: &str = "sv_licenseKeyToken";

/// Project name shown in the server list.
pub const PROJECT_NAME_VAR: &str = "sv_projectName";

/// Project description shown in the server list.
pub const PROJECT_DESC_VAR: &str = "sv_projectDesc";

/// Server hostname.
pub const HOSTNAME_VAR: &str = "sv_hostname";

/// IP override sent with the registration request.
pub const IP_OVERRIDE_VAR: &str = "sv_listingIpOverride";

/// Build version identifier.
pub const VERSION_VAR: &str = "version";

/// Externally reachable base URL, published once after registration.
pub const WEB_BASE_URL_VAR: &str = "web_baseUrl";

// ============================================
// VarFlags
// ============================================

/// Per-entry variable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarFlags {
    /// No restrictions.
    None,
    /// Entry rejects writes after registration.
    ReadOnly,
}

// ============================================
// VarStore
// ============================================

#[derive(Debug, Clone)]
struct VarEntry {
    value: String,
    flags: VarFlags,
}

/// Thread-safe console variable store.
///
/// Variables are plain strings with per-entry flags. `set` on an unknown
/// name creates an unrestricted entry, matching console semantics; reserved
/// entries are created up front with [`register`](Self::register).
#[derive(Debug, Default)]
pub struct VarStore {
    entries: RwLock<HashMap<String, VarEntry>>,
}

impl VarStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variable with explicit flags.
    ///
    /// # Errors
    /// Returns [`ServerError::VarExists`] if the name is already
    /// registered.
    pub fn register(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        flags: VarFlags,
    ) -> Result<()> {
        let name = name.into();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        if entries.contains_key(&name) {
            return Err(ServerError::VarExists { name });
        }

        entries.insert(
            name,
            VarEntry {
                value: value.into(),
                flags,
            },
        );
        Ok(())
    }

    /// Sets a variable, creating an unrestricted entry if absent.
    ///
    /// # Errors
    /// Returns [`ServerError::VarReadOnly`] if the entry is read-only.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        match entries.get_mut(&name) {
            Some(entry) if entry.flags == VarFlags::ReadOnly => {
                Err(ServerError::VarReadOnly { name })
            }
            Some(entry) => {
                entry.value = value.into();
                Ok(())
            }
            None => {
                entries.insert(
                    name,
                    VarEntry {
                        value: value.into(),
                        flags: VarFlags::None,
                    },
                );
                Ok(())
            }
        }
    }

    /// Returns the value of a variable, if present.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).map(|entry| entry.value.clone())
    }

    /// Returns `true` if the variable exists and is read-only.
    #[must_use]
    pub fn is_read_only(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(name)
            .is_some_and(|entry| entry.flags == VarFlags::ReadOnly)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_find() {
        let vars = VarStore::new();
        assert_eq!(vars.find("sv_hostname"), None);

        vars.set("sv_hostname", "my server").unwrap();
        assert_eq!(vars.find("sv_hostname"), Some("my server".to_string()));

        vars.set("sv_hostname", "renamed").unwrap();
        assert_eq!(vars.find("sv_hostname"), Some("renamed".to_string()));
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let vars = VarStore::new();
        vars.register(WEB_BASE_URL_VAR, "https://example.test/", VarFlags::ReadOnly)
            .unwrap();

        let result = vars.set(WEB_BASE_URL_VAR, "https://evil.test/");
        assert!(matches!(result, Err(ServerError::VarReadOnly { .. })));
        assert_eq!(
            vars.find(WEB_BASE_URL_VAR),
            Some("https://example.test/".to_string())
        );
        assert!(vars.is_read_only(WEB_BASE_URL_VAR));
    }

    #[test]
    fn test_register_twice_fails() {
        let vars = VarStore::new();
        vars.register("version", "v1.0.0", VarFlags::None).unwrap();

        let result = vars.register("version", "v2.0.0", VarFlags::None);
        assert!(matches!(result, Err(ServerError::VarExists { .. })));
        assert_eq!(vars.find("version"), Some("v1.0.0".to_string()));
    }
}
