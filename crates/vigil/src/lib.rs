//! # Vigil
//!
//! Keeps a signed-in session consistent with three racing time sources:
//! the access token's cryptographic lifetime, the user's physical
//! activity (or lack of it), and a bounded grace window once inactivity
//! is detected.
//!
//! The hard part is coordination, and it all converges in one place:
//! the session state machine is the **only** component that requests a
//! token refresh or declares a logout. Timers live in their owning
//! components ([`vigil_timing::ExpiryScheduler`],
//! [`vigil_activity::ActivityMonitor`]); decisions live here. That
//! split is what guarantees:
//!
//! - exactly one extension prompt at a time,
//! - no stale timer firing after a transition,
//! - a successful refresh re-arming every dependent timer,
//! - every ending path — expiry, inactivity, explicit logout, refresh
//!   failure — running the logout side effect exactly once.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vigil::prelude::*;
//!
//! # async fn run() -> Result<(), VigilError> {
//! let (probe, source) = vigil_activity::channel();
//! let auth = HttpAuthApi::new("https://auth.example.com/api");
//! let store = FileStore::new("credentials.json");
//!
//! let (handle, mut events) =
//!     spawn_session(SessionConfig::default(), auth, store, source);
//!
//! // Resume a persisted session, if any survived the last run.
//! handle.restore().await?;
//!
//! // Forward user input as presence evidence:
//! probe.report(ActivityKind::KeyPress);
//!
//! // React to lifecycle notifications:
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::Extended => { /* toast: session extended */ }
//!         SessionEvent::Ended => { /* navigate to the login screen */ }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod machine;
mod state;

pub use config::SessionConfig;
pub use error::VigilError;
pub use machine::{spawn_session, SessionHandle};
pub use state::{SessionEvent, SessionState, SessionView};

/// One-stop imports for applications embedding Vigil.
pub mod prelude {
    pub use crate::{
        spawn_session, SessionConfig, SessionEvent, SessionHandle, SessionState,
        SessionView, VigilError,
    };
    pub use vigil_activity::{ActivityKind, ActivityProbe, ActivitySource};
    pub use vigil_auth::{AuthApi, AuthError, HttpAuthApi, LoginOutcome};
    pub use vigil_protocol::{Session, UserIdentity};
    pub use vigil_store::{CredentialStore, FileStore, MemoryStore};
}
