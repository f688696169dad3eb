//! Text encoding of digests for the record store's index column.
//!
//! Digest bytes are rendered as standard padded base64 before they reach the
//! store, so they never meet binary collation or charset rules.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::blind_index::{Digest, DIGEST_SIZE};
use crate::error::Error;

/// Length of an encoded digest (base64 of [`DIGEST_SIZE`] bytes, padded).
pub const ENCODED_DIGEST_LEN: usize = DIGEST_SIZE.div_ceil(3) * 4;

/// Store-safe text form of a [`Digest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedDigest(String);

impl EncodedDigest {
    /// Encodes a digest.
    #[must_use]
    pub fn from_digest(digest: &Digest) -> Self {
        Self(STANDARD.encode(digest.as_bytes()))
    }

    /// Validates text read back from a store.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEncoding` if the text is not base64 of exactly
    /// [`DIGEST_SIZE`] bytes.
    pub fn parse(text: impl Into<String>) -> Result<Self, Error> {
        let text = text.into();
        let encoded = Self(text);
        encoded.decode()?;
        Ok(encoded)
    }

    /// Decodes back into raw digest bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEncoding` if the text is malformed.
    pub fn decode(&self) -> Result<Digest, Error> {
        let bytes = STANDARD
            .decode(&self.0)
            .map_err(|e| Error::InvalidEncoding(format!("digest is not base64: {e}")))?;
        Digest::from_slice(&bytes)
    }

    /// Returns the encoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value and returns the encoded text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncodedDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
