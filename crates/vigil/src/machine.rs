//! The session state machine: an isolated Tokio task that owns all
//! session data and decides every transition.
//!
//! The actor model keeps the concurrency story simple. Timers tick in
//! their owning components, refreshes run in a spawned task, commands
//! arrive from the UI — but every *decision* funnels through one
//! `tokio::select!` loop, and each transition runs to completion before
//! the next event is looked at. The `Session` record and the credential
//! store have exactly one writer: this task. No locks anywhere.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use vigil_activity::{ActivityMonitor, ActivitySource, ActivityUpdate};
use vigil_auth::{AuthApi, AuthError};
use vigil_protocol::{Session, UserIdentity};
use vigil_store::{CredentialStore, StoredCredentials};
use vigil_timing::{Deadline, ExpiryEvent, ExpiryScheduler};

use crate::{SessionConfig, SessionEvent, SessionState, SessionView, VigilError};

/// Command channel size. Commands are tiny and handled promptly; a
/// full channel means the UI is thousands of clicks ahead of us.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Commands sent to the session actor through its channel.
enum SessionCommand {
    /// A session was obtained (fresh login or restored credentials).
    Establish {
        session: Session,
        user: UserIdentity,
    },
    /// Load persisted credentials and establish from them, if any.
    Restore,
    /// The user confirmed the extension prompt ("keep me signed in").
    Confirm,
    /// The user declined the extension prompt.
    Cancel,
    /// Explicit logout, prompt or no prompt.
    Logout,
    /// Stop the actor. Timers are cancelled; persisted credentials are
    /// kept so a restarted process can restore the session.
    Shutdown,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running session actor. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Establishes a session from a login's token grant.
    pub async fn establish(
        &self,
        session: Session,
        user: UserIdentity,
    ) -> Result<(), VigilError> {
        self.send(SessionCommand::Establish { session, user }).await
    }

    /// Establishes a session from persisted credentials, if any exist.
    /// A no-op when the store is empty.
    pub async fn restore(&self) -> Result<(), VigilError> {
        self.send(SessionCommand::Restore).await
    }

    /// Confirms the extension prompt: requests a token refresh.
    pub async fn confirm(&self) -> Result<(), VigilError> {
        self.send(SessionCommand::Confirm).await
    }

    /// Declines the extension prompt: ends the session.
    pub async fn cancel(&self) -> Result<(), VigilError> {
        self.send(SessionCommand::Cancel).await
    }

    /// Ends the session explicitly, prompt or no prompt.
    pub async fn logout(&self) -> Result<(), VigilError> {
        self.send(SessionCommand::Logout).await
    }

    /// Stops the session actor. Idempotent: shutting down an already
    /// stopped actor is not an error.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(SessionCommand::Shutdown).await;
    }

    /// The current session snapshot.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// A `watch` receiver for observing session snapshots over time.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), VigilError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| VigilError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// spawn_session
// ---------------------------------------------------------------------------

/// Spawns the session actor and returns its handle plus the lifecycle
/// event stream for the UI / navigation collaborator.
///
/// The actor starts in `Unauthenticated` with no timers armed; call
/// [`SessionHandle::establish`] (after a login) or
/// [`SessionHandle::restore`] to bring a session up.
pub fn spawn_session<A, St, So>(
    config: SessionConfig,
    auth: A,
    store: St,
    source: So,
) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>)
where
    A: AuthApi,
    St: CredentialStore,
    So: ActivitySource,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(SessionView::unauthenticated());

    let monitor =
        ActivityMonitor::new(source, config.inactivity_timeout, config.activity_debounce);
    let expiry = ExpiryScheduler::new(config.warning_lead);

    let actor = SessionActor {
        config,
        auth: Arc::new(auth),
        store,
        session: None,
        user: None,
        state: SessionState::Unauthenticated,
        expiry,
        monitor,
        grace: Deadline::new(),
        refresh_rx: None,
        receiver: cmd_rx,
        view_tx,
        events_tx,
    };

    tokio::spawn(actor.run());

    (
        SessionHandle {
            sender: cmd_tx,
            view: view_rx,
        },
        events_rx,
    )
}

// ---------------------------------------------------------------------------
// SessionActor
// ---------------------------------------------------------------------------

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<A: AuthApi, St: CredentialStore, So: ActivitySource> {
    config: SessionConfig,
    /// Shared with the task spawned per refresh attempt.
    auth: Arc<A>,
    store: St,
    session: Option<Session>,
    user: Option<UserIdentity>,
    state: SessionState,
    expiry: ExpiryScheduler,
    monitor: ActivityMonitor<So>,
    /// Armed on entering `Inactive`; disarmed by confirm, cancel, a new
    /// qualifying activity event, or any transition out of `Inactive`.
    grace: Deadline,
    /// `Some` while exactly one refresh is in flight. Dropping the
    /// receiver is how a stale result gets discarded.
    refresh_rx: Option<oneshot::Receiver<Result<Session, AuthError>>>,
    receiver: mpsc::Receiver<SessionCommand>,
    view_tx: watch::Sender<SessionView>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl<A, St, So> SessionActor<A, St, So>
where
    A: AuthApi,
    St: CredentialStore,
    So: ActivitySource,
{
    /// Runs the actor loop until shutdown.
    async fn run(mut self) {
        info!("session manager started");

        loop {
            tokio::select! {
                maybe_cmd = self.receiver.recv() => {
                    match maybe_cmd {
                        Some(SessionCommand::Shutdown) | None => {
                            self.teardown();
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                event = self.expiry.next_event() => {
                    self.handle_expiry_event(event);
                }
                update = self.monitor.next_update() => {
                    self.handle_activity(update);
                }
                _ = self.grace.elapsed() => {
                    self.handle_grace_elapsed();
                }
                result = recv_refresh(&mut self.refresh_rx) => {
                    self.handle_refresh_result(result);
                }
            }
        }

        info!("session manager stopped");
    }

    // -- Commands ----------------------------------------------------------

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Establish { session, user } => {
                self.establish(session, user);
            }
            SessionCommand::Restore => self.restore(),
            SessionCommand::Confirm => self.confirm(),
            SessionCommand::Cancel => {
                if self.state.dialog_visible() {
                    self.force_logout("extension declined by user");
                } else {
                    debug!(state = %self.state, "cancel ignored: no prompt visible");
                }
            }
            SessionCommand::Logout => {
                if self.state.is_authenticated() {
                    self.force_logout("explicit logout");
                } else {
                    debug!("logout ignored: not authenticated");
                }
            }
            SessionCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    fn establish(&mut self, session: Session, user: UserIdentity) {
        if self.state.is_authenticated() {
            debug!("replacing existing session");
        }

        let Some(time_to_expiry) = session.time_to_expiry(SystemTime::now()) else {
            // Fail safe: a token that is already expired (or whose
            // expiry is uncomputable) can't start a session. No timer
            // is armed; the logout side effect runs immediately.
            self.session = Some(session);
            self.user = Some(user);
            self.force_logout("access token already expired at establish");
            return;
        };

        if let Err(e) = self.store.save(&StoredCredentials {
            session: session.clone(),
            user: user.clone(),
        }) {
            // The in-memory session still works; only restore-on-reload
            // is degraded.
            warn!(error = %e, "failed to persist credentials");
        }

        self.session = Some(session);
        self.user = Some(user);
        self.refresh_rx = None;
        self.expiry.arm(time_to_expiry);
        self.monitor.reset();
        self.grace.disarm();
        self.set_state(SessionState::Active);
        info!(
            expires_in_ms = time_to_expiry.as_millis() as u64,
            "session established"
        );
    }

    fn restore(&mut self) {
        match self.store.load() {
            Ok(Some(credentials)) => {
                info!(user_id = %credentials.user.id, "restoring persisted session");
                self.establish(credentials.session, credentials.user);
            }
            Ok(None) => debug!("no persisted credentials to restore"),
            Err(e) => {
                // A store we can't read can't prove a session. Drop it
                // and stay unauthenticated.
                warn!(error = %e, "failed to load persisted credentials");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to clear unreadable credentials");
                }
            }
        }
    }

    fn confirm(&mut self) {
        if !self.state.dialog_visible() {
            debug!(state = %self.state, "confirm ignored: no prompt visible");
            return;
        }
        if self.refresh_rx.is_some() {
            // At most one refresh in flight: a double-click on the
            // prompt must not fire a second exchange.
            debug!("confirm ignored: refresh already in flight");
            return;
        }
        let Some(session) = self.session.as_ref() else {
            debug!("confirm ignored: no session");
            return;
        };

        // The user has spoken; the grace countdown no longer applies.
        self.grace.disarm();

        let refresh_token = session.refresh_token.clone();
        let auth = Arc::clone(&self.auth);
        let (tx, rx) = oneshot::channel();
        self.refresh_rx = Some(rx);

        info!("extension confirmed: requesting token refresh");
        tokio::spawn(async move {
            let result = auth.refresh(&refresh_token).await;
            // The actor may have moved on (logout, shutdown); a closed
            // channel just means the result is stale.
            let _ = tx.send(result);
        });
    }

    // -- Timer events ------------------------------------------------------

    fn handle_expiry_event(&mut self, event: ExpiryEvent) {
        match event {
            ExpiryEvent::Warning => match self.state {
                SessionState::Active => {
                    info!("token expiring soon: prompting for extension");
                    self.set_state(SessionState::WarningVisible);
                }
                SessionState::WarningVisible | SessionState::Inactive => {
                    // One prompt at a time; the earlier trigger won.
                    debug!("expiry warning ignored: prompt already visible");
                }
                _ => debug!("expiry warning ignored: not authenticated"),
            },
            ExpiryEvent::Expired => {
                if self.state.is_authenticated() {
                    self.force_logout("access token expired");
                }
            }
        }
    }

    fn handle_activity(&mut self, update: ActivityUpdate) {
        match update {
            ActivityUpdate::Active(kind) => {
                // The monitor already pushed its own deadline out; the
                // machine only cares while a grace countdown is running.
                if self.state == SessionState::Inactive && self.grace.is_armed() {
                    debug!(?kind, "activity during grace period: forced logout averted");
                    self.grace.disarm();
                }
            }
            ActivityUpdate::InactivityElapsed => match self.state {
                SessionState::Active => {
                    info!("user inactive: prompting for extension");
                    self.set_state(SessionState::Inactive);
                    self.grace.arm(self.config.grace_period);
                }
                SessionState::WarningVisible | SessionState::Inactive => {
                    debug!("inactivity ignored: prompt already visible");
                }
                _ => debug!("inactivity ignored: not authenticated"),
            },
        }
    }

    fn handle_grace_elapsed(&mut self) {
        if self.state == SessionState::Inactive {
            self.force_logout("grace period elapsed without confirmation");
        } else {
            debug!(state = %self.state, "grace deadline ignored");
        }
    }

    // -- Refresh completion ------------------------------------------------

    fn handle_refresh_result(&mut self, result: Option<Result<Session, AuthError>>) {
        self.refresh_rx = None;

        if !self.state.is_authenticated() {
            debug!("refresh result discarded: session already ended");
            return;
        }

        let session = match result {
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                // No retry: a failed exchange ends the session the same
                // way natural expiry does.
                warn!(error = %e, "token refresh failed");
                self.force_logout("token refresh failed");
                return;
            }
            None => {
                warn!("refresh task vanished before reporting");
                self.force_logout("token refresh failed");
                return;
            }
        };

        let Some(time_to_expiry) = session.time_to_expiry(SystemTime::now()) else {
            warn!("refreshed token is already expired");
            self.session = Some(session);
            self.force_logout("refreshed token already expired");
            return;
        };

        if let Some(user) = &self.user {
            if let Err(e) = self.store.save(&StoredCredentials {
                session: session.clone(),
                user: user.clone(),
            }) {
                warn!(error = %e, "failed to persist refreshed credentials");
            }
        }

        self.session = Some(session);
        self.expiry.arm(time_to_expiry);
        self.monitor.reset();
        self.grace.disarm();
        self.set_state(SessionState::Active);
        let _ = self.events_tx.send(SessionEvent::Extended);
        info!(
            expires_in_ms = time_to_expiry.as_millis() as u64,
            "session extended"
        );
    }

    // -- Logout and teardown ----------------------------------------------

    /// Runs the logout side effect exactly once and collapses the
    /// machine back to `Unauthenticated`.
    ///
    /// Every ending path funnels through here — natural expiry, grace
    /// timeout, refresh failure, user cancel, explicit logout — so no
    /// path can double-fire the side effect or leave a timer armed.
    fn force_logout(&mut self, reason: &str) {
        if !self.state.is_authenticated() && self.session.is_none() {
            debug!(%reason, "logout ignored: no session");
            return;
        }

        info!(%reason, "ending session");
        self.expiry.disarm();
        self.grace.disarm();
        self.refresh_rx = None;
        self.session = None;
        self.user = None;
        self.set_state(SessionState::LoggedOut);

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear persisted credentials");
        }
        let _ = self.events_tx.send(SessionEvent::Ended);

        self.set_state(SessionState::Unauthenticated);
    }

    /// Cancels everything the actor owns. Persisted credentials are
    /// deliberately kept: shutdown is "the process is going away", not
    /// "the user signed out".
    fn teardown(&mut self) {
        self.expiry.disarm();
        self.grace.disarm();
        self.monitor.shutdown();
        self.refresh_rx = None;
        debug!("session actor torn down");
    }

    // -- Observability -----------------------------------------------------

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "state transition");
        }
        self.state = next;
        let _ = self.view_tx.send(SessionView {
            state: self.state,
            authenticated: self.state.is_authenticated(),
            dialog_visible: self.state.dialog_visible(),
            user: self.user.clone(),
        });
    }
}

/// Waits for the in-flight refresh to report, pending forever when no
/// refresh is in flight (so it is always safe as a select branch).
///
/// `None` means the refresh task died without reporting.
async fn recv_refresh(
    rx: &mut Option<oneshot::Receiver<Result<Session, AuthError>>>,
) -> Option<Result<Session, AuthError>> {
    match rx.as_mut() {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}
