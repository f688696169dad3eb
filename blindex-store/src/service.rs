//! Write and lookup paths for encrypted profiles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use blindex::context::AssociatedData;
use blindex::error::Error;
use blindex::provision::Keyring;
use tracing::{debug, warn};

use crate::error::{ServiceError, StoreError};
use crate::record::{ProfileEntry, ProfileRecord, RecordId, RevealedProfile};
use crate::store::RecordStore;

/// Upper bound for a single store call unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Profile operations over one keyring and one record store.
///
/// Plaintext only passes through this type; it is never stored, logged or
/// included in an error.
#[derive(Clone)]
pub struct ProfileService {
    keyring: Keyring,
    context: AssociatedData,
    store: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl ProfileService {
    /// Creates a service with the default associated data and timeout.
    #[must_use]
    pub fn new(keyring: Keyring, store: Arc<dyn RecordStore>) -> Self {
        Self { keyring, context: AssociatedData::default(), store, timeout: DEFAULT_STORE_TIMEOUT }
    }

    /// Sets the associated data every value is sealed under.
    #[must_use]
    pub fn with_context(mut self, context: AssociatedData) -> Self {
        self.context = context;
        self
    }

    /// Sets the per-call store timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    #[must_use]
    pub const fn context(&self) -> &AssociatedData {
        &self.context
    }

    /// Digests and seals `plaintext`, then stores both as one record.
    ///
    /// Nothing reaches the store unless both steps succeed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Crypto` if sealing fails, `ServiceError::Store`
    /// if the store rejects the record, and `ServiceError::Timeout` if it
    /// does not answer in time.
    pub async fn write_profile(&self, plaintext: &[u8]) -> Result<RecordId, ServiceError> {
        let entry = ProfileEntry::seal(&self.keyring, &self.context, plaintext)?;
        let id = self.bounded(self.store.put(entry)).await?;
        debug!(%id, "profile written");
        Ok(id)
    }

    /// Returns every record whose blind index matches `plaintext`.
    ///
    /// Several matches are returned as stored; deciding between them is up
    /// to the caller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` or `ServiceError::Timeout`.
    pub async fn find_profile(&self, plaintext: &[u8]) -> Result<Vec<ProfileRecord>, ServiceError> {
        let digest = self.keyring.digester().digest(plaintext).encode();
        let records = self.bounded(self.store.find_by_digest(&digest)).await?;
        debug!(matches = records.len(), "profile lookup finished");
        Ok(records)
    }

    /// Opens the sealed value of one record.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Crypto(Error::AuthenticationFailed)` if the
    /// record was tampered with or sealed under another key or context.
    pub fn open(&self, record: &ProfileRecord) -> Result<Vec<u8>, ServiceError> {
        Ok(self.keyring.cipher().open(record.sealed(), &self.context)?)
    }

    /// Finds matching records and opens each of them.
    ///
    /// Records that fail authentication are left out, so a corrupted record
    /// looks the same as no record.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` or `ServiceError::Timeout`.
    pub async fn lookup(&self, plaintext: &[u8]) -> Result<Vec<RevealedProfile>, ServiceError> {
        let records = self.find_profile(plaintext).await?;
        let mut revealed = Vec::with_capacity(records.len());

        for record in records {
            match self.keyring.cipher().open(record.sealed(), &self.context) {
                Ok(plaintext) => revealed.push(RevealedProfile { record, plaintext }),
                Err(Error::AuthenticationFailed) => {
                    warn!(id = %record.id(), "dropping record that failed authentication");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(revealed)
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ServiceError::Timeout(self.timeout))?
            .map_err(ServiceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRecordStore;
    use blindex::key_provider::MemoryKeyProvider;
    use blindex::keys::KeyAlgorithm;
    use blindex::provision::ProvisionMode;

    fn service() -> ProfileService {
        let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };
        let keyring = Keyring::provision(&MemoryKeyProvider::new(), mode).unwrap();
        ProfileService::new(keyring, Arc::new(MemoryRecordStore::new()))
    }

    #[tokio::test]
    async fn test_write_then_find() {
        let service = service();
        let id = service.write_profile(b"alice@example.com").await.unwrap();

        let found = service.find_profile(b"alice@example.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), id);
        assert_eq!(service.open(&found[0]).unwrap(), b"alice@example.com");

        assert!(service.find_profile(b"bob@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_mismatch_on_open() {
        let service = service();
        service.write_profile(b"alice@example.com").await.unwrap();
        let record = service.find_profile(b"alice@example.com").await.unwrap().remove(0);

        let other = service.clone().with_context(AssociatedData::for_field("profile", "email", 2));
        assert!(other.open(&record).unwrap_err().is_authentication_failure());
        assert!(other.lookup(b"alice@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_reveals() {
        let service = service();
        service.write_profile(b"alice@example.com").await.unwrap();
        service.write_profile(b"alice@example.com").await.unwrap();

        let revealed = service.lookup(b"alice@example.com").await.unwrap();
        assert_eq!(revealed.len(), 2);
        assert!(revealed.iter().all(|r| r.plaintext == b"alice@example.com"));
    }
}
