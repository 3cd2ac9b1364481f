//! The activity-event source abstraction.

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ActivityKind
// ---------------------------------------------------------------------------

/// The interaction-event categories that count as evidence of user
/// presence.
///
/// The set is deliberately small and extendable: a new input modality
/// gets a new variant here, and every consumer downstream treats it as
/// presence automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerMove,
    KeyPress,
    Touch,
    Scroll,
}

// ---------------------------------------------------------------------------
// ActivitySource
// ---------------------------------------------------------------------------

/// Produces qualifying interaction events for the monitor.
///
/// Implementations translate platform input into [`ActivityKind`]
/// values: a windowing shell maps pointer/keyboard callbacks, a server
/// deployment maps heartbeat pings or incoming RPCs. The contract is a
/// plain event stream — no session knowledge, no side effects.
pub trait ActivitySource: Send + 'static {
    /// Waits for the next qualifying event.
    ///
    /// Returns `None` once the source is closed (all producers gone);
    /// after that the source never yields again.
    ///
    /// The `Send` bound on the returned future is what lets a monitor
    /// built over any source live inside a spawned task.
    fn next_activity(
        &mut self,
    ) -> impl std::future::Future<Output = Option<ActivityKind>> + Send;
}

// ---------------------------------------------------------------------------
// Channel-backed source
// ---------------------------------------------------------------------------

/// Creates a connected probe/source pair.
///
/// The [`ActivityProbe`] half is handed to whatever layer observes raw
/// input; the [`ChannelActivitySource`] half is handed to the monitor.
/// Dropping every probe closes the source — that is the unsubscribe
/// path, and like any drop it is idempotent by construction.
pub fn channel() -> (ActivityProbe, ChannelActivitySource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ActivityProbe { tx }, ChannelActivitySource { rx })
}

/// The producing half: report qualifying events from anywhere.
///
/// Cheap to clone (one sender per input hook is the expected shape).
/// Reporting never blocks and never fails — an event sent after the
/// consuming side is gone is silently dropped, which is the correct
/// behavior for presence evidence nobody is listening for.
#[derive(Debug, Clone)]
pub struct ActivityProbe {
    tx: mpsc::UnboundedSender<ActivityKind>,
}

impl ActivityProbe {
    /// Reports one qualifying event.
    pub fn report(&self, kind: ActivityKind) {
        let _ = self.tx.send(kind);
    }
}

/// The consuming half: an [`ActivitySource`] fed by [`ActivityProbe`]s.
#[derive(Debug)]
pub struct ChannelActivitySource {
    rx: mpsc::UnboundedReceiver<ActivityKind>,
}

impl ActivitySource for ChannelActivitySource {
    async fn next_activity(&mut self) -> Option<ActivityKind> {
        self.rx.recv().await
    }
}
