//! Error type for credential storage.

/// Errors that can occur while persisting or loading credentials.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying file operation failed.
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document exists but doesn't decode — e.g. a file
    /// truncated by an older process or edited by hand.
    #[error("credential store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
