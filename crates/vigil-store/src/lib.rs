//! Persisted credential storage for Vigil.
//!
//! Tokens and user identity survive a process restart so a reloaded
//! session can resume without a fresh login. All access goes through
//! the [`CredentialStore`] trait, and the session state machine is the
//! only writer — components that merely observe the session never touch
//! the store. Consolidating storage behind one interface is what makes
//! "cleared atomically on logout" enforceable at all.
//!
//! Two implementations:
//! - [`MemoryStore`] — process-local, for tests and ephemeral sessions.
//! - [`FileStore`] — one JSON document on disk, written via a sibling
//!   temp file and `rename` so a crash mid-write never leaves a
//!   half-written credential file.

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use vigil_protocol::{Session, UserIdentity};

/// Everything the store persists for one signed-in user: the token
/// pair (with its expiry) and the identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub session: Session,
    pub user: UserIdentity,
}

/// Key-value credential persistence.
///
/// The contract is all-or-nothing: `load` after `save` returns exactly
/// what was saved, and `clear` removes every credential field in one
/// step — there is no state where the access token survives but the
/// refresh token is gone.
pub trait CredentialStore: Send + Sync + 'static {
    /// Persists the credentials, replacing whatever was stored before.
    fn save(&self, credentials: &StoredCredentials) -> Result<(), StoreError>;

    /// Loads the stored credentials, or `None` when nothing is stored.
    fn load(&self) -> Result<Option<StoredCredentials>, StoreError>;

    /// Removes all stored credentials. Idempotent — clearing an empty
    /// store succeeds.
    fn clear(&self) -> Result<(), StoreError>;
}

/// A shared store is still a store — the session layer takes ownership
/// of its store, and `Arc` lets another component (a login screen, a
/// test) keep a read handle on the same storage.
impl<S: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<S> {
    fn save(&self, credentials: &StoredCredentials) -> Result<(), StoreError> {
        (**self).save(credentials)
    }

    fn load(&self) -> Result<Option<StoredCredentials>, StoreError> {
        (**self).load()
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
