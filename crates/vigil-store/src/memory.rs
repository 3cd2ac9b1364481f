//! In-memory credential store.

use parking_lot::Mutex;

use crate::{CredentialStore, StoreError, StoredCredentials};

/// Credential store backed by process memory.
///
/// Nothing survives a restart — useful for tests and for deployments
/// that deliberately require a fresh login per process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<StoredCredentials>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, credentials: &StoredCredentials) -> Result<(), StoreError> {
        *self.slot.lock() = Some(credentials.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<StoredCredentials>, StoreError> {
        Ok(self.slot.lock().clone())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
