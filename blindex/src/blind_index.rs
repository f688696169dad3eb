//! Blind index generation for searchable encryption.
//!
//! A blind index is a keyed digest of the plaintext. It is deterministic, so
//! the record store can find a value by equality, but it reveals nothing about
//! the value to anyone without the MAC key.

use std::fmt;

use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

use crate::encoding::EncodedDigest;
use crate::error::Error;
use crate::key_provider::KeyProvider;
use crate::keys::{KeyAlgorithm, KeyRole, SymmetricKeyMaterial};

type HmacSha256 = Hmac<Sha256>;

/// Blind index output size (full HMAC-SHA256 tag, never truncated).
pub const DIGEST_SIZE: usize = 32;

/// Fixed-length output of [`KeyedDigester::digest`].
///
/// Only meaningful for equality comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Builds a digest from exactly [`DIGEST_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEncoding` on any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let arr: [u8; DIGEST_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidEncoding(format!(
                "digest must be {DIGEST_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Returns the store-safe text encoding.
    #[must_use]
    pub fn encode(&self) -> EncodedDigest {
        EncodedDigest::from_digest(self)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Digest").field(&self.encode().as_str()).finish()
    }
}

/// Computes blind indexes with HMAC-SHA256.
///
/// The keyed MAC is built once at construction and cloned for every call, so
/// a constructed digester cannot fail and is safe to share across threads.
///
/// # Example
///
/// ```
/// use blindex::blind_index::KeyedDigester;
/// use blindex::keys::{KeyAlgorithm, SymmetricKeyMaterial};
///
/// let key = SymmetricKeyMaterial::generate(KeyAlgorithm::HmacSha256);
/// let digester = KeyedDigester::new(&key).expect("valid MAC key");
///
/// let d1 = digester.digest(b"alice@example.com");
/// let d2 = digester.digest(b"alice@example.com");
/// assert_eq!(d1, d2);
/// ```
#[derive(Clone)]
pub struct KeyedDigester {
    mac: HmacSha256,
    key_id: u32,
}

impl KeyedDigester {
    /// Builds a digester from MAC key material.
    ///
    /// # Errors
    ///
    /// Returns `Error::PrimitiveConstructionFailed` if the key is not tagged
    /// for HMAC-SHA256 or cannot key the MAC.
    pub fn new(key: &SymmetricKeyMaterial) -> Result<Self, Error> {
        if key.algorithm() != KeyAlgorithm::HmacSha256 {
            return Err(Error::PrimitiveConstructionFailed(format!(
                "digester needs a {} key, got {}",
                KeyAlgorithm::HmacSha256.tag(),
                key.algorithm().tag()
            )));
        }

        let mac = HmacSha256::new_from_slice(key.secret().expose_secret())
            .map_err(|e| Error::PrimitiveConstructionFailed(format!("invalid MAC key: {e}")))?;

        Ok(Self { mac, key_id: key.key_id() })
    }

    /// Builds a digester from the provider's MAC key.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyUnavailable` if the provider has no MAC key, and the
    /// errors of [`KeyedDigester::new`] otherwise.
    pub fn from_provider<P: KeyProvider + ?Sized>(provider: &P) -> Result<Self, Error> {
        let key = provider.load_key(KeyRole::Mac)?.ok_or(Error::KeyUnavailable(KeyRole::Mac))?;
        Self::new(&key)
    }

    /// Computes the blind index of `plaintext`.
    ///
    /// Equal inputs always give byte-identical output under the same key.
    #[must_use]
    pub fn digest(&self, plaintext: &[u8]) -> Digest {
        let mut mac = self.mac.clone();
        mac.update(plaintext);
        let mut out = [0u8; DIGEST_SIZE];
        out.copy_from_slice(&mac.finalize().into_bytes());
        Digest(out)
    }

    /// Returns the id of the key this digester was built with.
    #[must_use]
    pub const fn key_id(&self) -> u32 {
        self.key_id
    }
}

impl fmt::Debug for KeyedDigester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedDigester")
            .field("algorithm", &KeyAlgorithm::HmacSha256.tag())
            .field("key_id", &format_args!("{:08x}", self.key_id))
            .finish_non_exhaustive()
    }
}
