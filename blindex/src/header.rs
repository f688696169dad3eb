//! Framing of sealed values.
//!
//! Every sealed value starts with a fixed-size header:
//! - Format version
//! - AEAD algorithm
//! - Key identifier
//! - Nonce
//!
//! The header bytes are fed into the AEAD as associated data, so they are
//! authenticated together with the ciphertext.

use crate::error::Error;
use crate::keys::{KeyAlgorithm, KeyRole};

/// Format version for sealed values.
pub const FORMAT_VERSION: u8 = 1;

/// Nonce size for both supported AEADs (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size for both supported AEADs (128 bits).
pub const TAG_SIZE: usize = 16;

/// Total header length in bytes.
pub const HEADER_SIZE: usize = 1 + 1 + 4 + NONCE_SIZE;

/// Header of a sealed value.
///
/// Format:
/// ```text
/// [version:1][algorithm:1][key_id:4 BE][nonce:12]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedHeader {
    version: u8,
    algorithm: KeyAlgorithm,
    key_id: u32,
    nonce: [u8; NONCE_SIZE],
}

impl SealedHeader {
    /// Creates a header for the current format version.
    #[must_use]
    pub const fn new(algorithm: KeyAlgorithm, key_id: u32, nonce: [u8; NONCE_SIZE]) -> Self {
        Self { version: FORMAT_VERSION, algorithm, key_id, nonce }
    }

    /// Returns the format version.
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Returns the AEAD algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Returns the key identifier.
    #[must_use]
    pub const fn key_id(&self) -> u32 {
        self.key_id
    }

    /// Returns the nonce.
    #[must_use]
    pub const fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Serializes the header to its fixed-size byte form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.version;
        bytes[1] = self.algorithm.wire_id();
        bytes[2..6].copy_from_slice(&self.key_id.to_be_bytes());
        bytes[6..].copy_from_slice(&self.nonce);
        bytes
    }

    /// Parses the header at the start of `data`.
    ///
    /// Returns the header and the remaining bytes (ciphertext and tag).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHeader` if:
    /// - The data is shorter than a header plus a tag
    /// - The version is not supported
    /// - The algorithm byte is unknown or not an AEAD
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), Error> {
        if data.len() < HEADER_SIZE + TAG_SIZE {
            return Err(Error::InvalidHeader(format!(
                "sealed value too short: {} bytes (min: {})",
                data.len(),
                HEADER_SIZE + TAG_SIZE
            )));
        }

        let version = data[0];
        if version != FORMAT_VERSION {
            return Err(Error::InvalidHeader(format!(
                "unsupported version: {version} (supported: {FORMAT_VERSION})"
            )));
        }

        let algorithm = KeyAlgorithm::from_wire_id(data[1])
            .filter(|alg| alg.role() == KeyRole::Aead)
            .ok_or_else(|| Error::InvalidHeader(format!("unknown algorithm id: {}", data[1])))?;

        let key_id = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&data[6..HEADER_SIZE]);

        Ok((Self { version, algorithm, key_id, nonce }, &data[HEADER_SIZE..]))
    }
}
