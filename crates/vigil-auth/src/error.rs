//! Error type for auth-service calls.

/// Why a login or refresh call failed.
///
/// Every failure mode of the exchange — the request never completed,
/// the service said no, the service answered gibberish — normalizes to
/// one of these variants, each carrying the server's message where one
/// exists. To the session layer they are equally fatal: a failed
/// refresh ends the session, it is never retried here.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request never produced an HTTP response (DNS, connect,
    /// timeout, TLS).
    #[error("auth request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-2xx status. `message` is the
    /// server's `{ "message": ... }` body when present, otherwise the
    /// status' canonical reason.
    #[error("auth request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The service answered 2xx but the payload didn't decode.
    #[error("malformed auth response: {0}")]
    Malformed(String),
}
