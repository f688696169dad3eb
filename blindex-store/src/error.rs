//! Error types for record stores and the profile service.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a [`crate::store::RecordStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Filesystem failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized or deserialized.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted record is malformed.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Backend(format!("blocking task failed: {err}"))
    }
}

/// Errors raised by [`crate::service::ProfileService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Digest or seal/open failure.
    #[error(transparent)]
    Crypto(#[from] blindex::error::Error),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The record store did not answer in time.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    /// Returns `true` if this is an authentication failure while opening.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Crypto(blindex::error::Error::AuthenticationFailed))
    }
}
