//! The [`AuthApi`] trait: the seam between the session layer and the
//! identity provider.
//!
//! The state machine only ever talks to this trait. Production wires in
//! [`HttpAuthApi`](crate::HttpAuthApi); tests wire in a stub that
//! resolves however the scenario needs — success, rejection, or a
//! never-resolving future to exercise the in-flight debounce.

use vigil_protocol::{Session, UserIdentity};

use crate::AuthError;

/// What a successful login returns: the token pair plus who the user is.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub user: UserIdentity,
}

/// Client for the external auth service.
///
/// # Trait bounds
///
/// - `Send + Sync` — the session actor shares the client with the task
///   it spawns for an in-flight refresh.
/// - `'static` — the client lives as long as the session actor.
///
/// Both methods make exactly one attempt. Error handling, retry policy,
/// and persistence of the returned tokens are the caller's concern.
pub trait AuthApi: Send + Sync + 'static {
    /// Exchanges credentials for a session via `POST /authenticate`.
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<LoginOutcome, AuthError>> + Send;

    /// Exchanges a refresh token for a new token pair via
    /// `POST /refresh-token`.
    ///
    /// Success returns the new [`Session`] and nothing else — the old
    /// session is untouched until the caller decides to replace it.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<Session, AuthError>> + Send;
}
