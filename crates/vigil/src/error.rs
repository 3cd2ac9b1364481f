//! Unified error type for the Vigil stack.

use vigil_auth::AuthError;
use vigil_store::StoreError;

/// Top-level error that wraps the crate-specific errors.
///
/// Applications embedding the `vigil` meta-crate deal with this single
/// type; the `#[from]` conversions let `?` lift sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// An auth-service call failed (login or refresh).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Credential persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session manager task is not running (already shut down).
    #[error("session manager is not running")]
    Unavailable,
}
