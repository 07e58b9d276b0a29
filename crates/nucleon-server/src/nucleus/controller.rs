// ============================================
// File: crates/nucleon-server/src/nucleus/controller.rs
// ============================================
//! # Nucleus Registration Controller
//!
//! ## Creation Reason
//! Owns the authentication retry state machine: issues registration
//! attempts against the Nucleus endpoint when conditions are met,
//! interprets the outcome, bootstraps the reverse tunnel on success, and
//! schedules retries with capped exponential backoff on failure.
//!
//! ## State Machine
//! ```text
//! Idle ──license token set──► Pending ──registration ok──► Authenticated
//!                               │  ▲                         (terminal)
//!                               │  │
//!                               └──┘ attempt failed: double backoff (capped)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - At most one registration request is ever outstanding; `on_tick` is
//!   safe to call at arbitrary frequency
//! - Attempt outcomes arrive through the completion queue and MUST be
//!   drained by the same task that calls `on_tick` (the server loop does
//!   this with a single `select!`); state fields are unsynchronized by
//!   design
//! - Backoff never resets once grown; after permanent success no further
//!   requests are issued for the lifetime of the process
//!
//! ## Last Modified
//! v0.1.0 - Initial controller implementation

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use nucleon_tunnel::ReverseTunnel;

use crate::error::Result;
use crate::nucleus::client::RegistrationApi;
use crate::nucleus::models::{BackoffPolicy, RegistrationRequest, RegistrationResponse};
use crate::nucleus::notices::NoticeEngine;
use crate::services::events::{EventBus, NUCLEUS_CONNECTED_EVENT};
use crate::services::licensing::Licensing;
use crate::services::listen::ListenManager;
use crate::services::vars::{
    VarFlags, VarStore, IP_OVERRIDE_VAR, LICENSE_KEY_TOKEN_VAR, WEB_BASE_URL_VAR,
};

/// Outcome of a registration attempt: raw response body bytes on success.
pub type CompletionOutcome = Result<Vec<u8>>;

// ============================================
// AuthAttemptState
// ============================================

/// Authentication attempt state, owned exclusively by the controller and
/// mutated only from the tick path and the completion path.
#[derive(Debug)]
struct AuthAttemptState {
    /// An attempt has been made since the license token appeared.
    attempted: bool,
    /// Terminal success flag; no requests are issued once set.
    succeeded: bool,
    /// A request is outstanding and its outcome has not yet been handled.
    in_flight: bool,
    /// Earliest time the next attempt may be issued. `None` means
    /// immediately eligible.
    next_eligible: Option<Instant>,
    /// Retry backoff policy.
    backoff: BackoffPolicy,
}

impl AuthAttemptState {
    fn new() -> Self {
        Self {
            attempted: false,
            succeeded: false,
            in_flight: false,
            next_eligible: None,
            backoff: BackoffPolicy::new(),
        }
    }
}

// ============================================
// NucleusController
// ============================================

/// Registration retry controller.
///
/// Driven by the application heartbeat through [`on_tick`](Self::on_tick);
/// attempt outcomes are marshalled back through the completion queue and
/// applied with [`on_completion`](Self::on_completion).
pub struct NucleusController {
    vars: Arc<VarStore>,
    licensing: Arc<dyn Licensing>,
    listen: Arc<ListenManager>,
    events: Arc<EventBus>,
    api: Arc<dyn RegistrationApi>,
    notices: NoticeEngine,
    relay_addr: String,
    completion_tx: mpsc::Sender<CompletionOutcome>,
    state: AuthAttemptState,
}

impl NucleusController {
    /// Creates the controller.
    ///
    /// `completion_tx` is the sending half of the queue the owning task
    /// drains; every issued attempt reports its outcome there.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vars: Arc<VarStore>,
        licensing: Arc<dyn Licensing>,
        listen: Arc<ListenManager>,
        events: Arc<EventBus>,
        api: Arc<dyn RegistrationApi>,
        notices: NoticeEngine,
        relay_addr: impl Into<String>,
        completion_tx: mpsc::Sender<CompletionOutcome>,
    ) -> Self {
        Self {
            vars,
            licensing,
            listen,
            events,
            api,
            notices,
            relay_addr: relay_addr.into(),
            completion_tx,
            state: AuthAttemptState::new(),
        }
    }

    /// Returns `true` once registration has permanently succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.succeeded
    }

    /// Heartbeat entry point.
    ///
    /// Issues a registration attempt when the controller is not yet
    /// authenticated, no request is outstanding, the backoff window has
    /// elapsed, and both the license token and the derived credential are
    /// available. All other invocations are no-ops.
    pub fn on_tick(&mut self, now: Instant) {
        if self.state.succeeded || self.state.in_flight {
            return;
        }

        if let Some(next) = self.state.next_eligible {
            if now < next {
                return;
            }
        }

        let Some(license_token) = self.vars.find(LICENSE_KEY_TOKEN_VAR) else {
            return;
        };
        if license_token.is_empty() {
            return;
        }

        self.state.attempted = true;

        // The licensing collaborator may not be able to produce a
        // credential yet; defer silently to a later tick.
        let Some(credential) = self.licensing.nucleus_token(&license_token) else {
            return;
        };
        if credential.is_empty() {
            return;
        }

        self.issue_attempt(now, credential);
    }

    /// Issues one asynchronous registration attempt.
    fn issue_attempt(&mut self, now: Instant, credential: String) {
        let request = RegistrationRequest {
            token: credential,
            port: self.listen.primary_port().to_string(),
            ip_override: self.vars.find(IP_OVERRIDE_VAR).unwrap_or_default(),
        };

        // Provisional guard: ticks arriving during the network round-trip
        // must not re-issue.
        self.state.next_eligible = Some(now + self.state.backoff.current());
        self.state.in_flight = true;

        debug!(port = %request.port, "Issuing Nucleus registration attempt");

        let api = Arc::clone(&self.api);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = api.register(&request).await;
            let _ = completion_tx.send(outcome).await;
        });
    }

    /// Applies the outcome of a registration attempt.
    ///
    /// Must be invoked from the task that owns the controller, with
    /// outcomes taken from the completion queue. Concludes by evaluating
    /// the startup notices regardless of outcome, so diagnostics reflect
    /// the freshest known state.
    pub fn on_completion(&mut self, now: Instant, outcome: CompletionOutcome) {
        self.state.in_flight = false;

        match outcome {
            Ok(body) => match RegistrationResponse::parse(&body) {
                Ok(response) if response.is_complete() => {
                    self.finish_success(&response);
                }
                Ok(_) => {
                    warn!("Registration response missing host or tunnel token, will retry");
                    self.apply_backoff(now);
                }
                Err(e) => {
                    warn!("Registration response unparsable, will retry: {}", e);
                    self.apply_backoff(now);
                }
            },
            Err(e) => {
                warn!("Registration attempt failed, will retry: {}", e);
                self.apply_backoff(now);
            }
        }

        self.notices.evaluate_all(&self.vars);
    }

    /// Grows the backoff window and reschedules the next attempt.
    fn apply_backoff(&mut self, now: Instant) {
        self.state.backoff.advance();
        let window = self.state.backoff.current();
        self.state.next_eligible = Some(now + window);
        debug!(backoff_secs = window.as_secs(), "Next attempt rescheduled");
    }

    /// Bootstraps the tunnel and publishes the assigned endpoint.
    fn finish_success(&mut self, response: &RegistrationResponse) {
        let base_url = response.base_url();

        let tunnel = Arc::new(ReverseTunnel::new(self.relay_addr.clone()));
        tunnel.listen(&response.rp_token);
        self.listen.add_external_server(tunnel);

        if let Err(e) = self
            .vars
            .register(WEB_BASE_URL_VAR, &base_url, VarFlags::ReadOnly)
        {
            warn!("Failed to publish {}: {}", WEB_BASE_URL_VAR, e);
        }

        self.events.publish(NUCLEUS_CONNECTED_EVENT, &base_url);

        info!(url = %base_url, "Authenticated with Nucleus");

        self.state.succeeded = true;
    }
}

impl std::fmt::Debug for NucleusController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NucleusController")
            .field("state", &self.state)
            .field("relay_addr", &self.relay_addr)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::ServerError;
    use crate::services::licensing::KeyDerivedLicensing;

    /// Licensing stub that never produces a credential.
    struct NoCredentialLicensing;

    impl Licensing for NoCredentialLicensing {
        fn nucleus_token(&self, _license_token: &str) -> Option<String> {
            None
        }
    }

    /// Registration API stub replaying a scripted sequence of outcomes.
    struct ScriptedApi {
        calls: AtomicUsize,
        outcomes: Mutex<VecDeque<CompletionOutcome>>,
    }

    impl ScriptedApi {
        fn new(outcomes: Vec<CompletionOutcome>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcomes: Mutex::new(outcomes.into()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcomes: Mutex::new(VecDeque::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RegistrationApi for ScriptedApi {
        async fn register(&self, _request: &RegistrationRequest) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServerError::registration("endpoint unreachable")))
        }
    }

    struct Harness {
        controller: NucleusController,
        completion_rx: mpsc::Receiver<CompletionOutcome>,
        vars: Arc<VarStore>,
        listen: Arc<ListenManager>,
        events: Arc<EventBus>,
    }

    fn harness_with(api: Arc<dyn RegistrationApi>, licensing: Arc<dyn Licensing>) -> Harness {
        let vars = Arc::new(VarStore::new());
        let listen = Arc::new(ListenManager::new(30120));
        let events = Arc::new(EventBus::default());
        let (completion_tx, completion_rx) = mpsc::channel(8);

        let controller = NucleusController::new(
            Arc::clone(&vars),
            licensing,
            Arc::clone(&listen),
            Arc::clone(&events),
            api,
            NoticeEngine::with_builtin_notices(),
            // Discard port: tunnel connects are fire-and-forget in tests.
            "127.0.0.1:9",
            completion_tx,
        );

        Harness {
            controller,
            completion_rx,
            vars,
            listen,
            events,
        }
    }

    fn harness(api: Arc<dyn RegistrationApi>) -> Harness {
        let h = harness_with(api, Arc::new(KeyDerivedLicensing::new()));
        h.vars.set(LICENSE_KEY_TOKEN_VAR, "lk-test").unwrap();
        h
    }

    const SUCCESS_BODY: &[u8] = br#"{"host":"example.test","rpToken":"abc"}"#;

    #[tokio::test]
    async fn test_no_request_without_license_token() {
        let api = ScriptedApi::failing();
        let mut h = harness_with(
            Arc::clone(&api) as Arc<dyn RegistrationApi>,
            Arc::new(KeyDerivedLicensing::new()),
        );

        h.controller.on_tick(Instant::now());
        assert_eq!(api.call_count(), 0);

        // Present but empty is also not enough.
        h.vars.set(LICENSE_KEY_TOKEN_VAR, "").unwrap();
        h.controller.on_tick(Instant::now());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_defers_silently() {
        let api = ScriptedApi::failing();
        let mut h = harness_with(
            Arc::clone(&api) as Arc<dyn RegistrationApi>,
            Arc::new(NoCredentialLicensing),
        );
        h.vars.set(LICENSE_KEY_TOKEN_VAR, "lk-test").unwrap();

        h.controller.on_tick(Instant::now());
        assert_eq!(api.call_count(), 0);
        assert!(h.controller.state.attempted);
        assert!(!h.controller.state.in_flight);
    }

    #[tokio::test]
    async fn test_back_to_back_ticks_issue_one_request() {
        let api = ScriptedApi::failing();
        let mut h = harness(Arc::clone(&api) as Arc<dyn RegistrationApi>);

        let t0 = Instant::now();
        h.controller.on_tick(t0);
        h.controller.on_tick(t0);

        let outcome = h.completion_rx.recv().await.unwrap();
        assert!(outcome.is_err());
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provisional_guard_set_at_issue() {
        let api = ScriptedApi::failing();
        let mut h = harness(Arc::clone(&api) as Arc<dyn RegistrationApi>);

        let t0 = Instant::now();
        assert_eq!(h.controller.state.backoff.current(), Duration::from_secs(15));
        h.controller.on_tick(t0);

        assert_eq!(
            h.controller.state.next_eligible,
            Some(t0 + Duration::from_secs(15))
        );
        assert!(h.controller.state.in_flight);
    }

    #[tokio::test]
    async fn test_backoff_growth_across_failures() {
        let api = ScriptedApi::failing();
        let mut h = harness(Arc::clone(&api) as Arc<dyn RegistrationApi>);

        let mut t = Instant::now();
        let expected_windows = [30u64, 60, 120, 240, 480, 900, 900, 900];

        for (i, secs) in expected_windows.iter().enumerate() {
            h.controller.on_tick(t);
            let outcome = h.completion_rx.recv().await.unwrap();
            h.controller.on_completion(t, outcome);

            assert_eq!(api.call_count(), i + 1);
            assert_eq!(
                h.controller.state.next_eligible,
                Some(t + Duration::from_secs(*secs))
            );

            // A tick inside the window is a no-op.
            h.controller.on_tick(t + Duration::from_secs(*secs - 1));
            assert_eq!(api.call_count(), i + 1);

            t += Duration::from_secs(*secs);
        }
    }

    #[tokio::test]
    async fn test_success_publishes_endpoint() {
        let api = ScriptedApi::new(vec![Ok(SUCCESS_BODY.to_vec())]);
        let mut h = harness(Arc::clone(&api) as Arc<dyn RegistrationApi>);
        let mut event_rx = h.events.subscribe();

        let t0 = Instant::now();
        h.controller.on_tick(t0);
        let outcome = h.completion_rx.recv().await.unwrap();
        h.controller.on_completion(t0, outcome);

        assert!(h.controller.is_authenticated());
        assert_eq!(
            h.vars.find(WEB_BASE_URL_VAR),
            Some("https://example.test/".to_string())
        );
        assert!(h.vars.is_read_only(WEB_BASE_URL_VAR));
        assert_eq!(h.listen.external_count(), 1);

        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.name, NUCLEUS_CONNECTED_EVENT);
        assert_eq!(event.payload, "https://example.test/");
    }

    #[tokio::test]
    async fn test_terminal_state_ignores_further_ticks() {
        let api = ScriptedApi::new(vec![Ok(SUCCESS_BODY.to_vec())]);
        let mut h = harness(Arc::clone(&api) as Arc<dyn RegistrationApi>);

        let t0 = Instant::now();
        h.controller.on_tick(t0);
        let outcome = h.completion_rx.recv().await.unwrap();
        h.controller.on_completion(t0, outcome);
        assert!(h.controller.is_authenticated());

        // Ticks far past any backoff window issue nothing.
        for hours in 1u64..=5 {
            h.controller.on_tick(t0 + Duration::from_secs(hours * 3600));
        }
        assert_eq!(api.call_count(), 1);
        assert_eq!(h.listen.external_count(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_response_is_retried() {
        let api = ScriptedApi::new(vec![Ok(b"{}".to_vec()), Ok(SUCCESS_BODY.to_vec())]);
        let mut h = harness(Arc::clone(&api) as Arc<dyn RegistrationApi>);

        let t0 = Instant::now();
        h.controller.on_tick(t0);
        let outcome = h.completion_rx.recv().await.unwrap();
        h.controller.on_completion(t0, outcome);

        // Not success: no variable published, backoff grew.
        assert!(!h.controller.is_authenticated());
        assert_eq!(h.vars.find(WEB_BASE_URL_VAR), None);
        assert_eq!(
            h.controller.state.next_eligible,
            Some(t0 + Duration::from_secs(30))
        );

        // The retry succeeds once the window elapses.
        let t1 = t0 + Duration::from_secs(30);
        h.controller.on_tick(t1);
        let outcome = h.completion_rx.recv().await.unwrap();
        h.controller.on_completion(t1, outcome);

        assert!(h.controller.is_authenticated());
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unparsable_response_is_retried() {
        let api = ScriptedApi::new(vec![Ok(b"not json".to_vec())]);
        let mut h = harness(Arc::clone(&api) as Arc<dyn RegistrationApi>);

        let t0 = Instant::now();
        h.controller.on_tick(t0);
        let outcome = h.completion_rx.recv().await.unwrap();
        h.controller.on_completion(t0, outcome);

        assert!(!h.controller.is_authenticated());
        assert_eq!(
            h.controller.state.next_eligible,
            Some(t0 + Duration::from_secs(30))
        );
    }
}
