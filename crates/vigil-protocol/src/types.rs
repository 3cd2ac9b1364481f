//! Request/response bodies of the auth service and the session record.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The role the auth service assigns to a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Who the signed-in user is, as reported by `POST /authenticate`.
///
/// Persisted alongside the tokens so a reloaded process can restore the
/// session without a fresh login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The credential pair for one signed-in session.
///
/// - `access_token` — short-lived, proves authentication, carries the
///   expiry instant below.
/// - `refresh_token` — longer-lived, exchanged for a new access token via
///   `POST /refresh-token`.
/// - `expires_at_ms` — when the access token expires, in milliseconds
///   since the Unix epoch, exactly as issued by the auth service.
///
/// Both tokens are opaque strings: the session layer never inspects or
/// validates them, it only stores and forwards them. A `Session` is owned
/// exclusively by the state machine — it is replaced on a successful
/// login/refresh and dropped on logout, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_ms: u64,
}

impl Session {
    /// How long until the access token expires, measured from `now`.
    ///
    /// Returns `None` when the expiry is not strictly in the future —
    /// including the degenerate case of a wall clock before the Unix
    /// epoch, which makes the expiry uncomputable. Callers must treat
    /// `None` as "already expired" and end the session rather than let
    /// an unparsable expiry keep it alive indefinitely.
    pub fn time_to_expiry(&self, now: SystemTime) -> Option<Duration> {
        let now_ms = now
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()?
            .as_millis() as u64;
        if self.expires_at_ms > now_ms {
            Some(Duration::from_millis(self.expires_at_ms - now_ms))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// POST /authenticate
// ---------------------------------------------------------------------------

/// Body of `POST /authenticate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
}

/// Success body of `POST /authenticate`.
///
/// `expiry_time` is the access token's expiry as epoch milliseconds —
/// the same representation [`Session::expires_at_ms`] stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry_time: u64,
    pub user: UserIdentity,
}

impl AuthenticateResponse {
    /// Splits the response into the session record and the user identity.
    pub fn into_parts(self) -> (Session, UserIdentity) {
        (
            Session {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at_ms: self.expiry_time,
            },
            self.user,
        )
    }
}

// ---------------------------------------------------------------------------
// POST /refresh-token
// ---------------------------------------------------------------------------

/// Body of `POST /refresh-token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Success body of `POST /refresh-token`: a fresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry_time: u64,
}

impl From<RefreshResponse> for Session {
    fn from(resp: RefreshResponse) -> Self {
        Session {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at_ms: resp.expiry_time,
        }
    }
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Body the auth service attaches to a non-2xx response.
///
/// `message` is optional: some gateways return an empty body or plain
/// text on failure, and the client must still produce a usable error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =========================================================================
// Tests
// =========================================================================
