//! Timer ownership for the session layer.
//!
//! Two pieces live here:
//!
//! - [`Deadline`] — a one-shot armed/disarmed timer that pends forever
//!   while disarmed, so it can sit as a `tokio::select!` branch without
//!   ever firing spuriously.
//! - [`ExpiryScheduler`] — the warning/expiry deadline pair for one
//!   access token, re-armed wholesale on every refresh.
//!
//! Timer *ownership* is concentrated here; timer *decisions* stay with
//! the session state machine. Nothing in this crate knows what a warning
//! or an expiry means — it only reports that an instant passed.
//!
//! # Integration
//!
//! Both types are designed to sit inside a state machine's
//! `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         event = scheduler.next_event() => { /* warning or expiry */ }
//!         _ = grace.elapsed() => { /* grace period ran out */ }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// A one-shot timer that is either *armed* (will fire at a scheduled
/// instant) or *disarmed* (pends forever).
///
/// At most one instant is scheduled at a time: [`arm`](Self::arm) always
/// replaces the previous schedule, and a fired deadline disarms itself,
/// so a single `arm` can never produce two firings.
#[derive(Debug)]
pub struct Deadline {
    fire_at: Option<TokioInstant>,
}

impl Deadline {
    /// Creates a disarmed deadline.
    pub fn new() -> Self {
        Self { fire_at: None }
    }

    /// Schedules the deadline to fire `after` from now.
    ///
    /// Re-arming replaces any previously scheduled instant — the old
    /// schedule can no longer fire.
    pub fn arm(&mut self, after: Duration) {
        self.fire_at = Some(TokioInstant::now() + after);
        trace!(after_ms = after.as_millis() as u64, "deadline armed");
    }

    /// Cancels the scheduled instant. Safe to call repeatedly.
    pub fn disarm(&mut self) {
        self.fire_at = None;
    }

    /// Whether an instant is currently scheduled.
    pub fn is_armed(&self) -> bool {
        self.fire_at.is_some()
    }

    /// Resolves once when the armed instant passes, then disarms.
    ///
    /// While disarmed this future never completes — `tokio::select!`
    /// will simply keep servicing its other branches.
    pub async fn elapsed(&mut self) {
        match self.fire_at {
            Some(at) => {
                time::sleep_until(at).await;
                self.fire_at = None;
            }
            None => {
                // Never completes; select! handles other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ExpiryScheduler
// ---------------------------------------------------------------------------

/// What [`ExpiryScheduler::next_event`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryEvent {
    /// The warning lead time before expiry has been reached.
    Warning,
    /// The access token has expired.
    Expired,
}

/// Result of arming the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// Both deadlines are scheduled.
    Armed {
        /// Delay until the warning fires. Zero means it fires on the
        /// next poll — the lead time exceeded the time to expiry.
        warning_in: Duration,
        /// Delay until expiry fires.
        expires_in: Duration,
    },
    /// The token is already expired; nothing was armed. The caller must
    /// handle the expiry synchronously.
    AlreadyExpired,
}

/// Owns the warning and expiry deadlines for one access token.
///
/// ```text
/// arm(tte) ──→ [Warning at tte - lead] ──→ [Expired at tte]
///    │                                          │
///    └──── re-arm / disarm cancels both ────────┘
/// ```
///
/// Re-arming with a fresh time-to-expiry (the idiom after a successful
/// token refresh) always supersedes the previous pair — a deadline from
/// an old schedule can never fire after a new `arm` or a `disarm`.
#[derive(Debug)]
pub struct ExpiryScheduler {
    warning_lead: Duration,
    warning: Deadline,
    expiry: Deadline,
}

impl ExpiryScheduler {
    /// Creates a disarmed scheduler with the given warning lead time.
    pub fn new(warning_lead: Duration) -> Self {
        Self {
            warning_lead,
            warning: Deadline::new(),
            expiry: Deadline::new(),
        }
    }

    /// Schedules the warning/expiry pair for a token that expires in
    /// `time_to_expiry`.
    ///
    /// A zero `time_to_expiry` arms nothing and returns
    /// [`ArmOutcome::AlreadyExpired`]: callers resolve "the token is
    /// already dead" synchronously instead of waiting on a timer that
    /// would fire immediately. The warning delay is clamped at zero, so
    /// a lead time longer than the token's remaining life produces an
    /// immediate warning rather than one scheduled in the past.
    pub fn arm(&mut self, time_to_expiry: Duration) -> ArmOutcome {
        if time_to_expiry.is_zero() {
            self.disarm();
            return ArmOutcome::AlreadyExpired;
        }

        let warning_in = time_to_expiry.saturating_sub(self.warning_lead);
        self.warning.arm(warning_in);
        self.expiry.arm(time_to_expiry);

        debug!(
            warning_in_ms = warning_in.as_millis() as u64,
            expires_in_ms = time_to_expiry.as_millis() as u64,
            "expiry schedule armed"
        );

        ArmOutcome::Armed {
            warning_in,
            expires_in: time_to_expiry,
        }
    }

    /// Cancels both deadlines, fired or not. Safe to call repeatedly.
    pub fn disarm(&mut self) {
        self.warning.disarm();
        self.expiry.disarm();
    }

    /// Whether any deadline is still scheduled.
    pub fn is_armed(&self) -> bool {
        self.warning.is_armed() || self.expiry.is_armed()
    }

    /// Waits for the next scheduled event.
    ///
    /// Yields [`ExpiryEvent::Warning`] once and [`ExpiryEvent::Expired`]
    /// once per armed schedule, in that order under normal timing. Pends
    /// forever while disarmed.
    pub async fn next_event(&mut self) -> ExpiryEvent {
        tokio::select! {
            _ = self.warning.elapsed() => ExpiryEvent::Warning,
            _ = self.expiry.elapsed() => ExpiryEvent::Expired,
        }
    }
}
