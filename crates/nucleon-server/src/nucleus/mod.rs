// ============================================
// File: crates/nucleon-server/src/nucleus/mod.rs
// ============================================
//! # Nucleus Registration Module
//!
//! ## Creation Reason
//! Bootstraps the server's trust relationship with the central
//! registration authority ("Nucleus"): periodic authentication attempts
//! with capped exponential backoff, reverse tunnel bootstrap on success,
//! and conditional startup notices after every concluded attempt.
//!
//! ## Main Functionality
//! - `NucleusController`: authentication retry state machine
//! - `RegistrationApi` / `HttpRegistrationApi`: registration transport
//! - `NoticeEngine`: conditional startup notice evaluation
//! - Wire models and the backoff policy
//!
//! ## Registration Flow
//! ```text
//! ┌──────────┐ tick ┌────────────────────┐  POST   ┌─────────────┐
//! │  Server  │─────►│ NucleusController  │────────►│   Nucleus   │
//! │   loop   │      │ (backoff, state)   │◄────────│  endpoint   │
//! └──────────┘      └─────────┬──────────┘ outcome └─────────────┘
//!                             │ success
//!                             ▼
//!                   reverse tunnel + web_baseUrl + event
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial nucleus module

pub mod client;
pub mod controller;
pub mod models;
pub mod notices;

pub use client::{HttpRegistrationApi, RegistrationApi};
pub use controller::{CompletionOutcome, NucleusController};
pub use models::{BackoffPolicy, RegistrationRequest, RegistrationResponse};
pub use notices::{NoticeDefinition, NoticeEngine};
