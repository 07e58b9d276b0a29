// ============================================
// File: crates/nucleon-server/src/nucleus/notices.rs
// ============================================
//! # Conditional Startup Notices
//!
//! ## Creation Reason
//! Evaluates a fixed list of condition/action pairs after each
//! authentication attempt concludes, so operators see diagnostics that
//! reflect the freshest known state.
//!
//! ## Design
//! Data-driven: an ordered table of `NoticeDefinition` entries rather than
//! inline control flow, so new notices are added without touching the
//! evaluation loop. Conditions are pure reads of the variable store; only
//! actions produce output. No memoization: every pass re-runs all
//! conditions fresh.
//!
//! ## Last Modified
//! v0.1.0 - Initial notice engine

use tracing::info;

use crate::services::vars::{VarStore, PROJECT_NAME_VAR, VERSION_VAR};

/// Marker substring identifying unsupported custom builds.
const UNSUPPORTED_BUILD_MARKER: &str = "no-version";

// ============================================
// NoticeDefinition
// ============================================

/// A single conditional notice.
///
/// Notices are independent: one firing never suppresses or alters another.
pub struct NoticeDefinition {
    /// Notice name, logged when the notice fires.
    pub name: &'static str,
    /// Pure predicate over the variable store.
    pub condition: fn(&VarStore) -> bool,
    /// Side effect invoked when the condition holds.
    pub action: fn(),
}

// ============================================
// NoticeEngine
// ============================================

/// Ordered notice evaluator.
pub struct NoticeEngine {
    notices: Vec<NoticeDefinition>,
}

impl NoticeEngine {
    /// Creates an engine over an explicit notice table.
    #[must_use]
    pub fn new(notices: Vec<NoticeDefinition>) -> Self {
        Self { notices }
    }

    /// Creates an engine with the built-in notices.
    #[must_use]
    pub fn with_builtin_notices() -> Self {
        Self::new(vec![
            NoticeDefinition {
                name: "project identity unset",
                condition: project_identity_unset,
                action: print_project_identity_guidance,
            },
            NoticeDefinition {
                name: "unsupported build",
                condition: unsupported_build,
                action: print_unsupported_build_caution,
            },
        ])
    }

    /// Evaluates every notice in definition order.
    ///
    /// For each entry whose condition holds, logs the notice name and runs
    /// its action. Safe to call repeatedly; conditions are re-evaluated
    /// fresh on every pass.
    pub fn evaluate_all(&self, vars: &VarStore) {
        for notice in &self.notices {
            if (notice.condition)(vars) {
                info!(notice = notice.name, "Server notice");
                (notice.action)();
            }
        }
    }
}

// ============================================
// Built-in notices
// ============================================

fn project_identity_unset(vars: &VarStore) -> bool {
    vars.find(PROJECT_NAME_VAR).map_or(true, |v| v.is_empty())
}

fn print_project_identity_guidance() {
    info!(
        "You don't have sv_projectName/sv_projectDesc set. These variables augment \
         sv_hostname and fix your server name being cut off in the server list. \
         Use `sets sv_projectName ..` and `sets sv_projectDesc ..` to set them."
    );
}

fn unsupported_build(vars: &VarStore) -> bool {
    vars.find(VERSION_VAR)
        .is_some_and(|v| v.contains(UNSUPPORTED_BUILD_MARKER))
}

fn print_unsupported_build_caution() {
    info!("Note: You are using an unsupported custom server build. Please take care.");
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_project_identity_unset_fires_on_empty() {
        let vars = VarStore::new();
        assert!(project_identity_unset(&vars));

        vars.set(PROJECT_NAME_VAR, "").unwrap();
        assert!(project_identity_unset(&vars));

        vars.set(PROJECT_NAME_VAR, "MyServer").unwrap();
        assert!(!project_identity_unset(&vars));
    }

    #[test]
    fn test_unsupported_build_matches_marker() {
        let vars = VarStore::new();
        assert!(!unsupported_build(&vars));

        vars.set(VERSION_VAR, "v1.0.0-no-version-abc").unwrap();
        assert!(unsupported_build(&vars));

        vars.set(VERSION_VAR, "v1.0.0-release").unwrap();
        assert!(!unsupported_build(&vars));
    }

    // Action side effects are observed through counters; fn pointers keep
    // the table data-driven, so the counters are statics.
    static FIRST_FIRED: AtomicUsize = AtomicUsize::new(0);
    static SECOND_FIRED: AtomicUsize = AtomicUsize::new(0);

    fn counting_engine() -> NoticeEngine {
        NoticeEngine::new(vec![
            NoticeDefinition {
                name: "first",
                condition: |_| true,
                action: || {
                    FIRST_FIRED.fetch_add(1, Ordering::SeqCst);
                },
            },
            NoticeDefinition {
                name: "second",
                condition: |_| true,
                action: || {
                    SECOND_FIRED.fetch_add(1, Ordering::SeqCst);
                },
            },
        ])
    }

    #[test]
    fn test_notices_are_independent_and_rerun() {
        let vars = VarStore::new();
        let engine = counting_engine();

        engine.evaluate_all(&vars);
        engine.evaluate_all(&vars);

        // Both fired on both passes: no memoization, no suppression.
        assert_eq!(FIRST_FIRED.load(Ordering::SeqCst), 2);
        assert_eq!(SECOND_FIRED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_builtin_evaluation_does_not_panic() {
        let vars = VarStore::new();
        let engine = NoticeEngine::with_builtin_notices();
        engine.evaluate_all(&vars);
    }
}
