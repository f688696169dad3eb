//! Profile records as they cross the store boundary.

use std::fmt;

use blindex::context::AssociatedData;
use blindex::encoding::EncodedDigest;
use blindex::error::Error;
use blindex::provision::Keyring;
use blindex::vault::SealedValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digest and sealed value computed from one plaintext in one operation.
///
/// The only way to build an entry is [`ProfileEntry::seal`], so a store never
/// receives a digest and a ciphertext that belong to different values.
#[derive(Debug, Clone)]
pub struct ProfileEntry {
    digest: EncodedDigest,
    sealed: SealedValue,
}

impl ProfileEntry {
    /// Digests and seals `plaintext`.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncryptionFailed` if sealing fails. Nothing is built
    /// in that case.
    pub fn seal(
        keyring: &Keyring,
        context: &AssociatedData,
        plaintext: &[u8],
    ) -> Result<Self, Error> {
        let digest = keyring.digester().digest(plaintext).encode();
        let sealed = keyring.cipher().seal(plaintext, context)?;
        Ok(Self { digest, sealed })
    }

    /// Returns the encoded blind index.
    #[must_use]
    pub const fn digest(&self) -> &EncodedDigest {
        &self.digest
    }

    /// Returns the sealed value.
    #[must_use]
    pub const fn sealed(&self) -> &SealedValue {
        &self.sealed
    }

    /// Splits the entry for persistence.
    #[must_use]
    pub fn into_parts(self) -> (EncodedDigest, SealedValue) {
        (self.digest, self.sealed)
    }
}

/// A persisted profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    id: RecordId,
    digest: EncodedDigest,
    sealed: SealedValue,
    created_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Assembles a record read back from a backend.
    #[must_use]
    pub const fn new(
        id: RecordId,
        digest: EncodedDigest,
        sealed: SealedValue,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { id, digest, sealed, created_at }
    }

    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    #[must_use]
    pub const fn digest(&self) -> &EncodedDigest {
        &self.digest
    }

    #[must_use]
    pub const fn sealed(&self) -> &SealedValue {
        &self.sealed
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A record together with its opened plaintext.
#[derive(Debug, Clone)]
pub struct RevealedProfile {
    /// The stored record.
    pub record: ProfileRecord,
    /// The authenticated plaintext.
    pub plaintext: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blindex::key_provider::MemoryKeyProvider;
    use blindex::keys::{KeyAlgorithm, SymmetricKeyMaterial};
    use blindex::provision::ProvisionMode;

    fn keyring() -> Keyring {
        let provider = MemoryKeyProvider::with_keys([
            SymmetricKeyMaterial::generate(KeyAlgorithm::HmacSha256),
            SymmetricKeyMaterial::generate(KeyAlgorithm::Aes256Gcm),
        ]);
        Keyring::provision(&provider, ProvisionMode::Strict).unwrap()
    }

    #[test]
    fn test_entry_pairs_digest_and_ciphertext() {
        let keyring = keyring();
        let context = AssociatedData::default();

        let entry = ProfileEntry::seal(&keyring, &context, b"alice@example.com").unwrap();

        assert_eq!(entry.digest(), &keyring.digester().digest(b"alice@example.com").encode());
        assert_eq!(keyring.cipher().open(entry.sealed(), &context).unwrap(), b"alice@example.com");
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::new(42).to_string(), "42");
        assert_eq!(serde_json::to_string(&RecordId::new(7)).unwrap(), "7");
    }
}
