//! The inactivity monitor: turns raw activity events into presence
//! updates for the session layer.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};
use vigil_timing::Deadline;

use crate::{ActivityKind, ActivitySource};

/// What [`ActivityMonitor::next_update`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityUpdate {
    /// A qualifying event occurred. Updates within the debounce window
    /// are coalesced — the caller sees at most one `Active` per window,
    /// even under a pointer-move storm.
    Active(ActivityKind),
    /// The inactivity timeout elapsed with no qualifying event. Fires
    /// exactly once, then the monitor stays silent until the next
    /// qualifying event restarts the cycle.
    InactivityElapsed,
}

/// Watches an [`ActivitySource`] and owns the inactivity timer.
///
/// ```text
///  event ──→ [reset deadline, update last_active] ──→ Active (debounced)
///                      │
///            (timeout, no event)
///                      ▼
///              InactivityElapsed ──→ silent until next event
/// ```
///
/// Every qualifying event resets the internal deadline, but the caller
/// is only notified at most once per debounce window: the deadline
/// reset is what keeps the session alive, the notification is merely
/// advisory, and flooding the state machine with per-pixel pointer
/// moves would drown real events.
#[derive(Debug)]
pub struct ActivityMonitor<S: ActivitySource> {
    /// `None` after shutdown or once the source closed.
    source: Option<S>,
    inactivity_timeout: Duration,
    debounce: Duration,
    inactivity: Deadline,
    last_active: Instant,
    last_yield: Option<Instant>,
}

impl<S: ActivitySource> ActivityMonitor<S> {
    /// Creates the monitor and starts the first inactivity cycle
    /// immediately — construction counts as the initial "activity".
    pub fn new(source: S, inactivity_timeout: Duration, debounce: Duration) -> Self {
        let mut inactivity = Deadline::new();
        inactivity.arm(inactivity_timeout);
        Self {
            source: Some(source),
            inactivity_timeout,
            debounce,
            inactivity,
            last_active: Instant::now(),
            last_yield: None,
        }
    }

    /// Waits for the next presence update.
    ///
    /// Pends forever once [`shutdown`](Self::shutdown) has run, so it
    /// is always safe as a `tokio::select!` branch.
    pub async fn next_update(&mut self) -> ActivityUpdate {
        loop {
            let Some(source) = self.source.as_mut() else {
                // No source left: only the inactivity deadline (if still
                // armed) can produce an update.
                self.inactivity.elapsed().await;
                debug!("inactivity timeout elapsed");
                return ActivityUpdate::InactivityElapsed;
            };

            tokio::select! {
                maybe = source.next_activity() => match maybe {
                    Some(kind) => {
                        let now = Instant::now();
                        self.last_active = now;
                        self.inactivity.arm(self.inactivity_timeout);

                        let due = self
                            .last_yield
                            .is_none_or(|at| now.duration_since(at) >= self.debounce);
                        if due {
                            self.last_yield = Some(now);
                            trace!(?kind, "activity observed");
                            return ActivityUpdate::Active(kind);
                        }
                        // Within the debounce window: the reset above
                        // already happened, the notification is coalesced.
                    }
                    None => {
                        debug!("activity source closed");
                        self.source = None;
                    }
                },
                _ = self.inactivity.elapsed() => {
                    debug!("inactivity timeout elapsed");
                    return ActivityUpdate::InactivityElapsed;
                }
            }
        }
    }

    /// The debounced "last active" timestamp: when the most recent
    /// qualifying event was observed (or when the monitor was created,
    /// if none has been).
    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    /// Restarts the inactivity cycle without a qualifying event — used
    /// after a successful token refresh, which counts as renewed
    /// presence.
    pub fn reset(&mut self) {
        self.inactivity.arm(self.inactivity_timeout);
    }

    /// Stops watching the source and cancels the inactivity timer.
    ///
    /// After this, [`next_update`](Self::next_update) pends forever.
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.source.take().is_some() {
            debug!("activity monitor shut down");
        }
        self.inactivity.disarm();
    }
}
