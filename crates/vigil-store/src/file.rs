//! File-backed credential store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{CredentialStore, StoreError, StoredCredentials};

/// Credential store persisting one JSON document to disk.
///
/// Writes are atomic: the document goes to a sibling temp file first
/// and is then `rename`d over the target, so a crash mid-write leaves
/// either the old credentials or the new ones — never a torn file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store persisting to `path`. The file (and its parent
    /// directory) are created lazily on the first `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path the store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl CredentialStore for FileStore {
    fn save(&self, credentials: &StoredCredentials) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(credentials)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<StoredCredentials>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "credentials cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
