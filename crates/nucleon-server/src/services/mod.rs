// ============================================
// File: crates/nucleon-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! Collaborators the registration core depends on: the console variable
//! store, the internal event bus, the listen manager, and the licensing
//! service.

pub mod events;
pub mod licensing;
pub mod listen;
pub mod vars;

pub use events::{Event, EventBus, NUCLEUS_CONNECTED_EVENT};
pub use licensing::{KeyDerivedLicensing, Licensing};
pub use listen::ListenManager;
pub use vars::{VarFlags, VarStore};
