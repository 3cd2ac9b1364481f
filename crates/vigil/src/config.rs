//! Session timing configuration.

use std::time::Duration;

/// The timing knobs of the session lifecycle.
///
/// Constructed once at process start and handed to
/// [`spawn_session`](crate::spawn_session); immutable for the process
/// lifetime. Components receive the values they need through their
/// constructors — nothing reads configuration ambiently.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long before token expiry the extension prompt appears.
    pub warning_lead: Duration,

    /// Idle duration after which the user is prompted without waiting
    /// for the expiry-driven warning.
    pub inactivity_timeout: Duration,

    /// How long an idle, unconfirmed session survives after the
    /// inactivity prompt before it is forcibly ended.
    pub grace_period: Duration,

    /// Coalescing window for activity notifications — a pointer-move
    /// storm still counts as presence but reaches the state machine at
    /// most once per window.
    pub activity_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warning_lead: Duration::from_secs(60),
            inactivity_timeout: Duration::from_secs(300),
            grace_period: Duration::from_secs(60),
            activity_debounce: Duration::from_millis(100),
        }
    }
}
