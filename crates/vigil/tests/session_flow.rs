//! End-to-end tests for the session state machine.
//!
//! Time is paused (`start_paused = true`) and auto-advances to the
//! nearest armed timer, so a 60-second expiry scenario runs in
//! microseconds and every firing instant is assertable. Token expiries
//! are computed from the real wall clock at session creation, which
//! introduces sub-millisecond skew against the paused Tokio clock —
//! timing assertions therefore use a one-second tolerance.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use vigil::{spawn_session, SessionConfig, SessionEvent, SessionHandle, SessionState, SessionView, VigilError};
use vigil_activity::{channel, ActivityKind, ActivityProbe};
use vigil_auth::{AuthApi, AuthError, LoginOutcome};
use vigil_protocol::{Role, Session, UserIdentity};
use vigil_store::{CredentialStore, MemoryStore, StoredCredentials};

// =========================================================================
// Harness
// =========================================================================

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_millis() as u64
}

fn session_expiring_in(lifetime: Duration) -> Session {
    Session {
        access_token: "at-test".into(),
        refresh_token: "rt-test".into(),
        expires_at_ms: now_ms() + lifetime.as_millis() as u64,
    }
}

fn expired_session() -> Session {
    Session {
        access_token: "at-stale".into(),
        refresh_token: "rt-stale".into(),
        expires_at_ms: now_ms().saturating_sub(5_000),
    }
}

fn user() -> UserIdentity {
    UserIdentity {
        id: "u-1".into(),
        email: "a@b.c".into(),
        name: "Ada".into(),
        role: Role::User,
    }
}

fn config(lead_s: u64, inactivity_s: u64, grace_s: u64) -> SessionConfig {
    SessionConfig {
        warning_lead: secs(lead_s),
        inactivity_timeout: secs(inactivity_s),
        grace_period: secs(grace_s),
        activity_debounce: Duration::from_millis(100),
    }
}

/// What the stub auth service does when asked to refresh.
#[derive(Clone, Copy)]
enum RefreshMode {
    /// Return a fresh token pair with this lifetime.
    Succeed { lifetime: Duration },
    /// Reject the exchange.
    Fail,
    /// Never resolve — an auth service that has gone dark.
    Hang,
}

#[derive(Clone)]
struct StubAuth {
    mode: RefreshMode,
    refresh_calls: Arc<AtomicUsize>,
}

impl StubAuth {
    fn new(mode: RefreshMode) -> Self {
        Self {
            mode,
            refresh_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl AuthApi for StubAuth {
    async fn login(&self, _email: &str, _password: &str) -> Result<LoginOutcome, AuthError> {
        Err(AuthError::Rejected {
            status: 501,
            message: "login not wired in these tests".into(),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            RefreshMode::Succeed { lifetime } => Ok(Session {
                access_token: "at-refreshed".into(),
                refresh_token: "rt-refreshed".into(),
                expires_at_ms: now_ms() + lifetime.as_millis() as u64,
            }),
            RefreshMode::Fail => Err(AuthError::Rejected {
                status: 401,
                message: "refresh token revoked".into(),
            }),
            RefreshMode::Hang => std::future::pending().await,
        }
    }
}

struct Harness {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    view: watch::Receiver<SessionView>,
    probe: ActivityProbe,
    store: Arc<MemoryStore>,
    refresh_calls: Arc<AtomicUsize>,
}

fn harness(config: SessionConfig, mode: RefreshMode) -> Harness {
    let (probe, source) = channel();
    let auth = StubAuth::new(mode);
    let refresh_calls = Arc::clone(&auth.refresh_calls);
    let store = Arc::new(MemoryStore::new());
    let (handle, events) = spawn_session(config, auth, Arc::clone(&store), source);
    let view = handle.subscribe();
    Harness {
        handle,
        events,
        view,
        probe,
        store,
        refresh_calls,
    }
}

/// Waits (auto-advancing time) until the view satisfies `pred`.
async fn wait_for_view(
    rx: &mut watch::Receiver<SessionView>,
    pred: impl Fn(&SessionView) -> bool,
) -> SessionView {
    tokio::time::timeout(secs(3600), async {
        loop {
            {
                let view = rx.borrow_and_update();
                if pred(&view) {
                    return (*view).clone();
                }
            }
            rx.changed().await.expect("session actor gone");
        }
    })
    .await
    .expect("timed out waiting for session view")
}

/// Waits (auto-advancing time) for the next lifecycle event.
async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(secs(3600), events.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

/// Asserts `actual` is within one second of `expected` (wall-clock skew
/// between session creation and establishment).
fn assert_around(actual: Duration, expected: Duration) {
    let lo = expected.saturating_sub(secs(1));
    let hi = expected + secs(1);
    assert!(
        actual >= lo && actual <= hi,
        "expected ~{expected:?}, got {actual:?}"
    );
}

/// Lets the actor drain already-queued commands/events without moving
/// the clock meaningfully.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// =========================================================================
// Expiry-driven path
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_warning_then_expiry_without_confirmation_ends_session() {
    // expiry = now + 60s, lead = 10s: warning at ~50s, logout at ~60s.
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::WarningVisible);
    assert!(view.authenticated);
    assert_around(start.elapsed(), secs(50));

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_around(start.elapsed(), secs(60));

    let view = h.handle.view();
    assert_eq!(view.state, SessionState::Unauthenticated);
    assert!(!view.dialog_visible);
    assert!(h.store.load().unwrap().is_none(), "credentials must be cleared");
}

#[tokio::test(start_paused = true)]
async fn test_establish_persists_credentials() {
    let h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    settle().await;

    let stored = h.store.load().unwrap().expect("credentials persisted");
    assert_eq!(stored.session.access_token, "at-test");
    assert_eq!(stored.user.id, "u-1");

    let view = h.handle.view();
    assert_eq!(view.state, SessionState::Active);
    assert_eq!(view.user.as_ref().map(|u| u.id.as_str()), Some("u-1"));
}

#[tokio::test(start_paused = true)]
async fn test_establish_replaces_previous_schedule() {
    // A second login supersedes the first session's timers: the old
    // ~50s warning must never fire.
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    settle().await;

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(300)), user())
        .await
        .unwrap();

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::WarningVisible);
    assert_around(start.elapsed(), secs(290));
}

// =========================================================================
// Immediate-expiry edge case
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_already_expired_session_goes_straight_to_logout() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    let start = Instant::now();
    h.handle.establish(expired_session(), user()).await.unwrap();

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_eq!(start.elapsed(), Duration::ZERO, "no timer may be involved");

    let view = h.handle.view();
    assert_eq!(view.state, SessionState::Unauthenticated);
    assert!(!view.dialog_visible, "no prompt may ever have been shown");
    assert!(h.store.load().unwrap().is_none());

    // Nothing else ever fires: no timer was armed.
    let nothing = tokio::time::timeout(secs(3600), h.events.recv()).await;
    assert!(nothing.is_err(), "no further lifecycle events expected");
}

// =========================================================================
// Inactivity-driven path
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_inactivity_then_grace_forces_logout() {
    // inactivity = 30s, grace = 15s: prompt at ~30s, forced logout at ~45s.
    let mut h = harness(config(10, 30, 15), RefreshMode::Fail);

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(600)), user())
        .await
        .unwrap();

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::Inactive);
    assert_around(start.elapsed(), secs(30));

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_around(start.elapsed(), secs(45));
    assert!(h.store.load().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_activity_keeps_session_out_of_inactive() {
    // The user keeps typing: the 30s inactivity prompt never appears;
    // the expiry-driven warning at ~50s is what eventually fires.
    let mut h = harness(config(10, 30, 15), RefreshMode::Fail);

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();

    // Activity at 20s and 40s resets the inactivity cycle each time.
    tokio::time::sleep(secs(20)).await;
    h.probe.report(ActivityKind::KeyPress);
    settle().await;
    assert!(!h.handle.view().dialog_visible);

    tokio::time::sleep(secs(20)).await;
    h.probe.report(ActivityKind::PointerMove);
    settle().await;
    assert!(!h.handle.view().dialog_visible);

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::WarningVisible);
    assert_around(start.elapsed(), secs(50));
}

#[tokio::test(start_paused = true)]
async fn test_activity_during_grace_averts_forced_logout() {
    // Inactive at ~30s arms a 15s grace deadline; activity at ~35s
    // disarms it. The prompt stays up (only confirm/cancel/expiry
    // dismiss it), but no forced logout happens at ~45s — the session
    // survives until natural expiry at ~120s.
    let mut h = harness(config(10, 30, 15), RefreshMode::Fail);

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(120)), user())
        .await
        .unwrap();

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::Inactive);

    tokio::time::sleep(secs(5)).await;
    h.probe.report(ActivityKind::PointerMove);
    settle().await;

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_around(start.elapsed(), secs(120));
    assert!(
        start.elapsed() > secs(100),
        "forced logout at ~45s must have been averted"
    );
}

// =========================================================================
// Prompt mutual exclusion
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_inactivity_while_warning_visible_is_noop() {
    // Warning fires first (~20s), inactivity second (~25s): the state
    // stays WarningVisible and no grace countdown starts, so nothing
    // ends the session at ~40s.
    let mut h = harness(config(100, 25, 15), RefreshMode::Fail);

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(120)), user())
        .await
        .unwrap();

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::WarningVisible);
    assert_around(start.elapsed(), secs(20));

    // Ride past the inactivity trigger and the would-be grace deadline.
    tokio::time::sleep(secs(30)).await;
    assert_eq!(h.handle.view().state, SessionState::WarningVisible);

    // The session still ends by natural expiry, not by grace.
    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_around(start.elapsed(), secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_warning_while_inactive_is_noop() {
    // Inactivity fires first (~10s), warning second (~20s): the state
    // stays Inactive and the grace countdown (armed at ~10s) still
    // forces logout at ~25s.
    let mut h = harness(config(100, 10, 15), RefreshMode::Fail);

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(120)), user())
        .await
        .unwrap();

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::Inactive);
    assert_around(start.elapsed(), secs(10));

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_around(start.elapsed(), secs(25));
}

// =========================================================================
// Confirm / refresh
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_confirm_success_extends_from_warning() {
    let mut h = harness(
        config(10, 100_000, 60),
        RefreshMode::Succeed { lifetime: secs(300) },
    );

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    wait_for_view(&mut h.view, |v| v.dialog_visible).await;

    let confirmed_at = Instant::now();
    h.handle.confirm().await.unwrap();

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Extended);
    let view = h.handle.view();
    assert_eq!(view.state, SessionState::Active);
    assert!(!view.dialog_visible, "prompt must hide on successful refresh");
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 1);

    // The new tokens are persisted and the scheduler is re-armed for
    // the refreshed expiry: next warning at ~290s after the confirm.
    let stored = h.store.load().unwrap().expect("refreshed credentials stored");
    assert_eq!(stored.session.access_token, "at-refreshed");

    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::WarningVisible);
    assert_around(confirmed_at.elapsed(), secs(290));
}

#[tokio::test(start_paused = true)]
async fn test_confirm_success_extends_from_inactivity() {
    // The prompt opened by inactivity behaves identically: confirm +
    // successful refresh hides it, returns to Active, and cancels the
    // grace countdown.
    let mut h = harness(
        config(10, 30, 15),
        RefreshMode::Succeed { lifetime: secs(600) },
    );

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(600)), user())
        .await
        .unwrap();

    // Inactive at ~30s; the grace deadline would force logout at ~45s.
    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::Inactive);

    h.handle.confirm().await.unwrap();
    assert_eq!(next_event(&mut h.events).await, SessionEvent::Extended);

    let view = h.handle.view();
    assert_eq!(view.state, SessionState::Active);
    assert!(!view.dialog_visible);

    // The old grace deadline (t=45s) is dead. The refresh also reset
    // inactivity tracking, so the next ending is a full new cycle:
    // Inactive again at ~60s, forced logout at ~75s.
    let early = tokio::time::timeout(secs(20), h.events.recv()).await;
    assert!(early.is_err(), "grace must have been cancelled by confirm");

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_around(start.elapsed(), secs(75));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_forces_logout_and_clears_credentials() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    wait_for_view(&mut h.view, |v| v.dialog_visible).await;

    h.handle.confirm().await.unwrap();

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_eq!(h.handle.view().state, SessionState::Unauthenticated);
    assert!(h.store.load().unwrap().is_none());
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 1, "no retry");
}

#[tokio::test(start_paused = true)]
async fn test_second_confirm_while_refresh_pending_is_ignored() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Hang);

    let start = Instant::now();
    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    wait_for_view(&mut h.view, |v| v.dialog_visible).await;

    // Double-click on the prompt: exactly one exchange may happen.
    h.handle.confirm().await.unwrap();
    settle().await;
    h.handle.confirm().await.unwrap();
    settle().await;
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 1);

    // The hung refresh never reports; natural expiry still wins.
    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_around(start.elapsed(), secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_confirm_without_prompt_is_ignored() {
    let h = harness(
        config(10, 100_000, 60),
        RefreshMode::Succeed { lifetime: secs(300) },
    );

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    settle().await;

    h.handle.confirm().await.unwrap();
    settle().await;

    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.handle.view().state, SessionState::Active);
}

// =========================================================================
// Cancel / explicit logout
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_on_prompt_ends_session() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    wait_for_view(&mut h.view, |v| v.dialog_visible).await;

    h.handle.cancel().await.unwrap();

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_eq!(h.handle.view().state, SessionState::Unauthenticated);
    assert!(h.store.load().unwrap().is_none());
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_logout_from_active() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    settle().await;

    h.handle.logout().await.unwrap();

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_eq!(h.handle.view().state, SessionState::Unauthenticated);
    assert!(h.store.load().unwrap().is_none());

    // The ended session fires nothing further: its timers are gone.
    let nothing = tokio::time::timeout(secs(3600), h.events.recv()).await;
    assert!(nothing.is_err(), "exactly one Ended per session");
}

#[tokio::test(start_paused = true)]
async fn test_logout_while_refresh_pending_discards_result() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Hang);

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    wait_for_view(&mut h.view, |v| v.dialog_visible).await;

    h.handle.confirm().await.unwrap();
    settle().await;
    h.handle.logout().await.unwrap();

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);

    // Whatever the in-flight refresh would have produced is stale; no
    // second lifecycle event may appear.
    let nothing = tokio::time::timeout(secs(3600), h.events.recv()).await;
    assert!(nothing.is_err());
}

// =========================================================================
// Restore
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_restore_establishes_persisted_session() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.store
        .save(&StoredCredentials {
            session: session_expiring_in(secs(60)),
            user: user(),
        })
        .unwrap();

    let start = Instant::now();
    h.handle.restore().await.unwrap();
    settle().await;

    let view = h.handle.view();
    assert_eq!(view.state, SessionState::Active);
    assert_eq!(view.user.as_ref().map(|u| u.id.as_str()), Some("u-1"));

    // The restored session runs the normal lifecycle.
    let view = wait_for_view(&mut h.view, |v| v.dialog_visible).await;
    assert_eq!(view.state, SessionState::WarningVisible);
    assert_around(start.elapsed(), secs(50));
}

#[tokio::test(start_paused = true)]
async fn test_restore_expired_credentials_clears_them() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.store
        .save(&StoredCredentials {
            session: expired_session(),
            user: user(),
        })
        .unwrap();

    h.handle.restore().await.unwrap();

    assert_eq!(next_event(&mut h.events).await, SessionEvent::Ended);
    assert_eq!(h.handle.view().state, SessionState::Unauthenticated);
    assert!(h.store.load().unwrap().is_none(), "stale credentials removed");
}

#[tokio::test(start_paused = true)]
async fn test_restore_with_empty_store_stays_unauthenticated() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle.restore().await.unwrap();
    settle().await;

    assert_eq!(h.handle.view().state, SessionState::Unauthenticated);
    let nothing = tokio::time::timeout(secs(3600), h.events.recv()).await;
    assert!(nothing.is_err(), "no session, no lifecycle events");
}

// =========================================================================
// Commands outside a session / teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_prompt_commands_before_login_are_ignored() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle.confirm().await.unwrap();
    h.handle.cancel().await.unwrap();
    h.handle.logout().await.unwrap();
    settle().await;

    assert_eq!(h.handle.view().state, SessionState::Unauthenticated);
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 0);
    let nothing = tokio::time::timeout(secs(3600), h.events.recv()).await;
    assert!(nothing.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_idempotent_and_cancels_timers() {
    let mut h = harness(config(10, 100_000, 60), RefreshMode::Fail);

    h.handle
        .establish(session_expiring_in(secs(60)), user())
        .await
        .unwrap();
    settle().await;

    h.handle.shutdown().await;
    h.handle.shutdown().await; // second teardown must be harmless
    settle().await;

    // No timer survives teardown: the ~50s warning and ~60s expiry
    // never fire, and the event stream just closes.
    let drained = tokio::time::timeout(secs(3600), h.events.recv()).await;
    assert!(
        matches!(drained, Ok(None)),
        "event stream closes with no stray events"
    );

    // Commands after shutdown report the manager as gone.
    let err = h.handle.confirm().await.unwrap_err();
    assert!(matches!(err, VigilError::Unavailable));

    // Shutdown is not logout: credentials survive for the next process.
    assert!(h.store.load().unwrap().is_some());
}
