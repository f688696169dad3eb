//! Symmetric key material and the algorithms it can drive.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use secrecy::{ExposeSecret, SecretVec};
use sha2::{Digest as _, Sha256};

use crate::error::Error;

/// Size of every key this crate accepts (256 bits).
pub const KEY_SIZE: usize = 32;

/// The job a key is provisioned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Keyed digests for the blind index.
    Mac,
    /// Authenticated encryption of the field value.
    Aead,
}

impl KeyRole {
    /// Short lowercase name, also used for key file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mac => "mac",
            Self::Aead => "aead",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mac => f.write_str("MAC key"),
            Self::Aead => f.write_str("AEAD key"),
        }
    }
}

/// Algorithms a [`SymmetricKeyMaterial`] can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// HMAC with SHA-256, full 32-byte tag.
    HmacSha256,
    /// AES-256 in Galois/Counter mode.
    Aes256Gcm,
    /// ChaCha20-Poly1305.
    ChaCha20Poly1305,
}

impl KeyAlgorithm {
    /// Stable name used in key files and configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    /// Human-readable tag, e.g. `"AEAD: AES-256-GCM"`.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::HmacSha256 => "MAC: HMAC-SHA256",
            Self::Aes256Gcm => "AEAD: AES-256-GCM",
            Self::ChaCha20Poly1305 => "AEAD: ChaCha20-Poly1305",
        }
    }

    /// Role this algorithm serves.
    #[must_use]
    pub const fn role(self) -> KeyRole {
        match self {
            Self::HmacSha256 => KeyRole::Mac,
            Self::Aes256Gcm | Self::ChaCha20Poly1305 => KeyRole::Aead,
        }
    }

    /// Required key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        KEY_SIZE
    }

    /// One-byte identifier written into sealed values.
    #[must_use]
    pub const fn wire_id(self) -> u8 {
        match self {
            Self::HmacSha256 => 0x01,
            Self::Aes256Gcm => 0x02,
            Self::ChaCha20Poly1305 => 0x03,
        }
    }

    /// Inverse of [`KeyAlgorithm::wire_id`].
    #[must_use]
    pub const fn from_wire_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(Self::HmacSha256),
            0x02 => Some(Self::Aes256Gcm),
            0x03 => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        Self::Aes256Gcm
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac-sha256" => Ok(Self::HmacSha256),
            "aes-256-gcm" | "aes256gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" | "chacha20poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(Error::PrimitiveConstructionFailed(format!("unknown algorithm: {other}"))),
        }
    }
}

/// Opaque key bytes tagged with the algorithm they are meant for.
///
/// The bytes are held in a [`SecretVec`] and zeroized on drop. `Debug` never
/// prints them.
pub struct SymmetricKeyMaterial {
    algorithm: KeyAlgorithm,
    bytes: SecretVec<u8>,
    key_id: u32,
}

impl SymmetricKeyMaterial {
    /// Wraps raw key bytes after validating them against the algorithm.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyUnavailable` for empty input and
    /// `Error::PrimitiveConstructionFailed` when the length does not match.
    pub fn new(algorithm: KeyAlgorithm, bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::KeyUnavailable(algorithm.role()));
        }
        if bytes.len() != algorithm.key_len() {
            return Err(Error::PrimitiveConstructionFailed(format!(
                "{} requires a {}-byte key, got {} bytes",
                algorithm.tag(),
                algorithm.key_len(),
                bytes.len()
            )));
        }

        let key_id = compute_key_id(algorithm, &bytes);
        Ok(Self { algorithm, bytes: SecretVec::new(bytes), key_id })
    }

    /// Generates fresh key material from the OS CSPRNG.
    #[must_use]
    pub fn generate(algorithm: KeyAlgorithm) -> Self {
        let mut bytes = vec![0u8; algorithm.key_len()];
        OsRng.fill_bytes(&mut bytes);
        let key_id = compute_key_id(algorithm, &bytes);
        Self { algorithm, bytes: SecretVec::new(bytes), key_id }
    }

    /// Returns the algorithm this key is tagged with.
    #[must_use]
    pub const fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Returns the role of the tagged algorithm.
    #[must_use]
    pub const fn role(&self) -> KeyRole {
        self.algorithm.role()
    }

    /// Returns the 32-bit identifier derived from the key.
    #[must_use]
    pub const fn key_id(&self) -> u32 {
        self.key_id
    }

    /// Returns the secret key bytes.
    #[must_use]
    pub const fn secret(&self) -> &SecretVec<u8> {
        &self.bytes
    }
}

impl Clone for SymmetricKeyMaterial {
    fn clone(&self) -> Self {
        Self {
            algorithm: self.algorithm,
            bytes: SecretVec::new(self.bytes.expose_secret().clone()),
            key_id: self.key_id,
        }
    }
}

impl fmt::Debug for SymmetricKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKeyMaterial")
            .field("algorithm", &self.algorithm.tag())
            .field("key_id", &format_args!("{:08x}", self.key_id))
            .finish_non_exhaustive()
    }
}

// First four bytes of SHA-256(name || key), big-endian.
fn compute_key_id(algorithm: KeyAlgorithm, bytes: &[u8]) -> u32 {
    let hash = Sha256::new().chain_update(algorithm.name()).chain_update(bytes).finalize();
    u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])
}
