//! Error types for `blindex` operations.

use std::fmt;

use crate::keys::KeyRole;

/// Main error type for `blindex` operations.
///
/// None of the variants ever carry plaintext or key bytes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable key material was supplied for the given role
    #[error("no key material available for {0}")]
    KeyUnavailable(KeyRole),

    /// The primitive could not be built from the supplied key material
    #[error("primitive construction failed: {0}")]
    PrimitiveConstructionFailed(String),

    /// Authentication tag verification failed (data may be corrupted, tampered,
    /// sealed under another key or bound to other associated data)
    #[error("authentication failed: sealed value may be corrupted or tampered")]
    AuthenticationFailed,

    /// Sealing failed inside the AEAD primitive
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Sealed value framing could not be parsed
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A text-encoded value could not be decoded
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Key provider operation failed
    #[error("key provider error: {0}")]
    KeyProvider(#[from] KeyProviderError),
}

impl Error {
    /// Returns `true` for errors that must abort startup.
    ///
    /// A process that hits one of these has no working cryptography and must
    /// not accept reads or writes.
    #[must_use]
    pub const fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::KeyUnavailable(_) | Self::PrimitiveConstructionFailed(_) | Self::KeyProvider(_)
        )
    }
}

/// Errors specific to key provider operations.
#[derive(Debug)]
pub enum KeyProviderError {
    /// Key for the role could not be found where the provider expected it
    KeyNotFound(String),

    /// Stored key is malformed
    InvalidKey(String),

    /// Provider cannot persist keys
    ReadOnly,

    /// A key already exists and would be overwritten
    AlreadyExists(String),

    /// I/O operation failed
    Io(std::io::Error),
}

impl fmt::Display for KeyProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyNotFound(what) => write!(f, "key not found: {what}"),
            Self::InvalidKey(msg) => write!(f, "invalid key: {msg}"),
            Self::ReadOnly => write!(f, "key provider is read-only"),
            Self::AlreadyExists(what) => write!(f, "key already exists: {what}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for KeyProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KeyProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
