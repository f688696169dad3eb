//! Authenticated encryption of field values.
//!
//! The [`AuthenticatedCipher`] seals a plaintext under a fixed associated-data
//! context with a fresh random nonce per call, and opens it again only with
//! the same key and the same context.

use std::fmt;
use std::sync::Arc;

use aes_gcm::{
    aead::{generic_array::GenericArray, rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256Gcm,
};
use chacha20poly1305::ChaCha20Poly1305;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::context::AssociatedData;
use crate::error::Error;
use crate::header::{SealedHeader, HEADER_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::key_provider::KeyProvider;
use crate::keys::{KeyAlgorithm, KeyRole, SymmetricKeyMaterial};

/// Cipher mode for sealing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherMode {
    /// AES-256-GCM (default).
    #[default]
    Aes256Gcm,
    /// ChaCha20-Poly1305.
    ChaCha20Poly1305,
}

impl CipherMode {
    /// Returns the key algorithm this mode needs.
    #[must_use]
    pub const fn algorithm(self) -> KeyAlgorithm {
        match self {
            Self::Aes256Gcm => KeyAlgorithm::Aes256Gcm,
            Self::ChaCha20Poly1305 => KeyAlgorithm::ChaCha20Poly1305,
        }
    }

    /// Returns the mode driven by `algorithm`, if it is an AEAD.
    #[must_use]
    pub const fn from_algorithm(algorithm: KeyAlgorithm) -> Option<Self> {
        match algorithm {
            KeyAlgorithm::Aes256Gcm => Some(Self::Aes256Gcm),
            KeyAlgorithm::ChaCha20Poly1305 => Some(Self::ChaCha20Poly1305),
            KeyAlgorithm::HmacSha256 => None,
        }
    }
}

/// Ciphertext produced by [`AuthenticatedCipher::seal`].
///
/// Layout: `[header][ciphertext][tag]`, see [`crate::header`]. The bytes are
/// opaque to callers and must reach the record store unchanged.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedValue(Vec<u8>);

impl SealedValue {
    /// Wraps bytes read back from a store.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the sealed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the value and returns the sealed bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SealedValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SealedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedValue").field("len", &self.0.len()).finish()
    }
}

enum AeadBackend {
    Aes256Gcm(Aes256Gcm),
    ChaCha20Poly1305(ChaCha20Poly1305),
}

struct CipherInner {
    backend: AeadBackend,
    mode: CipherMode,
    key_id: u32,
}

/// AEAD cipher for field values.
///
/// Built once from key material and immutable afterwards. Cloning is cheap
/// and clones share the keyed primitive.
///
/// # Example
///
/// ```
/// use blindex::context::AssociatedData;
/// use blindex::keys::{KeyAlgorithm, SymmetricKeyMaterial};
/// use blindex::vault::AuthenticatedCipher;
///
/// # fn main() -> Result<(), blindex::error::Error> {
/// let key = SymmetricKeyMaterial::generate(KeyAlgorithm::Aes256Gcm);
/// let cipher = AuthenticatedCipher::new(&key)?;
/// let ad = AssociatedData::default();
///
/// let sealed = cipher.seal(b"alice@example.com", &ad)?;
/// let opened = cipher.open(&sealed, &ad)?;
///
/// assert_eq!(opened, b"alice@example.com");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthenticatedCipher {
    inner: Arc<CipherInner>,
}

impl AuthenticatedCipher {
    /// Builds a cipher from AEAD key material.
    ///
    /// The cipher mode follows the key's algorithm tag.
    ///
    /// # Errors
    ///
    /// Returns `Error::PrimitiveConstructionFailed` if the key is not tagged
    /// for an AEAD or cannot key the primitive.
    pub fn new(key: &SymmetricKeyMaterial) -> Result<Self, Error> {
        let mode = CipherMode::from_algorithm(key.algorithm()).ok_or_else(|| {
            Error::PrimitiveConstructionFailed(format!(
                "cipher needs an AEAD key, got {}",
                key.algorithm().tag()
            ))
        })?;

        let secret = key.secret().expose_secret();
        let backend = match mode {
            CipherMode::Aes256Gcm => AeadBackend::Aes256Gcm(
                Aes256Gcm::new_from_slice(secret).map_err(|e| {
                    Error::PrimitiveConstructionFailed(format!("invalid AES-256-GCM key: {e}"))
                })?,
            ),
            CipherMode::ChaCha20Poly1305 => AeadBackend::ChaCha20Poly1305(
                ChaCha20Poly1305::new_from_slice(secret).map_err(|e| {
                    Error::PrimitiveConstructionFailed(format!(
                        "invalid ChaCha20-Poly1305 key: {e}"
                    ))
                })?,
            ),
        };

        Ok(Self { inner: Arc::new(CipherInner { backend, mode, key_id: key.key_id() }) })
    }

    /// Builds a cipher from the provider's AEAD key.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyUnavailable` if the provider has no AEAD key, and the
    /// errors of [`AuthenticatedCipher::new`] otherwise.
    pub fn from_provider<P: KeyProvider + ?Sized>(provider: &P) -> Result<Self, Error> {
        let key =
            provider.load_key(KeyRole::Aead)?.ok_or(Error::KeyUnavailable(KeyRole::Aead))?;
        Self::new(&key)
    }

    /// Returns the cipher mode.
    #[must_use]
    pub fn mode(&self) -> CipherMode {
        self.inner.mode
    }

    /// Returns the id of the key this cipher was built with.
    #[must_use]
    pub fn key_id(&self) -> u32 {
        self.inner.key_id
    }

    /// Seals `plaintext` under `context`.
    ///
    /// A fresh nonce is drawn from the OS CSPRNG for every call, so sealing the
    /// same plaintext twice yields different bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncryptionFailed` if the AEAD primitive fails.
    pub fn seal(&self, plaintext: &[u8], context: &AssociatedData) -> Result<SealedValue, Error> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let header = SealedHeader::new(self.inner.mode.algorithm(), self.inner.key_id, nonce);
        let header_bytes = header.to_bytes();
        let aad = bind_context(&header_bytes, context);

        let payload = Payload { msg: plaintext, aad: &aad };
        let ciphertext = match &self.inner.backend {
            AeadBackend::Aes256Gcm(cipher) => {
                cipher.encrypt(GenericArray::from_slice(&nonce), payload)
            }
            AeadBackend::ChaCha20Poly1305(cipher) => {
                cipher.encrypt(GenericArray::from_slice(&nonce), payload)
            }
        }
        .map_err(|e| Error::EncryptionFailed(format!("{:?} seal failed: {e}", self.inner.mode)))?;

        let mut sealed = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
        sealed.extend_from_slice(&header_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(SealedValue(sealed))
    }

    /// Opens a sealed value with the context it was sealed under.
    ///
    /// # Errors
    ///
    /// Returns `Error::AuthenticationFailed` if the value was tampered with or
    /// truncated, was sealed under another key, or was bound to another
    /// context. No plaintext is returned on any failure path.
    pub fn open(&self, sealed: &SealedValue, context: &AssociatedData) -> Result<Vec<u8>, Error> {
        let (header, body) = SealedHeader::parse(sealed.as_bytes()).map_err(|e| {
            debug!(error = %e, "rejecting malformed sealed value");
            Error::AuthenticationFailed
        })?;

        if header.algorithm() != self.inner.mode.algorithm() || header.key_id() != self.inner.key_id
        {
            debug!(key_id = header.key_id(), "sealed value belongs to another key");
            return Err(Error::AuthenticationFailed);
        }
        debug_assert!(body.len() >= TAG_SIZE);

        let header_bytes = header.to_bytes();
        let aad = bind_context(&header_bytes, context);
        let payload = Payload { msg: body, aad: &aad };

        match &self.inner.backend {
            AeadBackend::Aes256Gcm(cipher) => {
                cipher.decrypt(GenericArray::from_slice(header.nonce()), payload)
            }
            AeadBackend::ChaCha20Poly1305(cipher) => {
                cipher.decrypt(GenericArray::from_slice(header.nonce()), payload)
            }
        }
        .map_err(|_| Error::AuthenticationFailed)
    }
}

impl fmt::Debug for AuthenticatedCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedCipher")
            .field("mode", &self.inner.mode)
            .field("key_id", &format_args!("{:08x}", self.inner.key_id))
            .finish_non_exhaustive()
    }
}

// AEAD associated data: header || context.
fn bind_context(header: &[u8; HEADER_SIZE], context: &AssociatedData) -> Vec<u8> {
    let mut aad = Vec::with_capacity(HEADER_SIZE + context.as_bytes().len());
    aad.extend_from_slice(header);
    aad.extend_from_slice(context.as_bytes());
    aad
}
