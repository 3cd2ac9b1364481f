//! User-presence tracking for Vigil.
//!
//! This crate answers one question for the session layer: *is the user
//! still there?* It has two pieces:
//!
//! 1. **Event sources** — the [`ActivitySource`] trait abstracts over
//!    where qualifying interaction events come from. A desktop shell
//!    forwards pointer/key input; a headless deployment forwards
//!    heartbeat pings or RPC calls. The session layer never knows the
//!    difference.
//! 2. **The monitor** — [`ActivityMonitor`] consumes a source, keeps a
//!    debounced "last active" timestamp, and reports when the
//!    inactivity timeout elapses without a qualifying event.
//!
//! Pure event-to-notification translation: nothing here touches session
//! state, storage, or the network.

#![allow(async_fn_in_trait)]

mod monitor;
mod source;

pub use monitor::{ActivityMonitor, ActivityUpdate};
pub use source::{channel, ActivityKind, ActivityProbe, ActivitySource, ChannelActivitySource};
