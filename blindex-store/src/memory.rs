//! In-process record store.

use std::collections::HashMap;

use async_trait::async_trait;
use blindex::encoding::EncodedDigest;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::record::{ProfileEntry, ProfileRecord, RecordId};
use crate::store::RecordStore;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<ProfileRecord>,
    by_digest: HashMap<EncodedDigest, Vec<usize>>,
}

/// Record store kept entirely in memory.
///
/// Ids start at 1 and increase by one per put.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, entry: ProfileEntry) -> Result<RecordId, StoreError> {
        let (digest, sealed) = entry.into_parts();
        let mut inner = self.inner.write().await;

        let position = inner.records.len();
        let id = RecordId::new(position as u64 + 1);
        inner.by_digest.entry(digest.clone()).or_default().push(position);
        inner.records.push(ProfileRecord::new(id, digest, sealed, Utc::now()));

        debug!(%id, "stored profile in memory");
        Ok(id)
    }

    async fn find_by_digest(
        &self,
        digest: &EncodedDigest,
    ) -> Result<Vec<ProfileRecord>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .by_digest
            .get(digest)
            .map(|positions| positions.iter().map(|&p| inner.records[p].clone()).collect())
            .unwrap_or_default();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blindex::context::AssociatedData;
    use blindex::key_provider::MemoryKeyProvider;
    use blindex::provision::{Keyring, ProvisionMode};
    use blindex::keys::KeyAlgorithm;

    fn keyring() -> Keyring {
        let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };
        Keyring::provision(&MemoryKeyProvider::new(), mode).unwrap()
    }

    #[tokio::test]
    async fn test_put_assigns_sequential_ids() {
        let keyring = keyring();
        let ad = AssociatedData::default();
        let store = MemoryRecordStore::new();

        let first = ProfileEntry::seal(&keyring, &ad, b"a@example.com").unwrap();
        let second = ProfileEntry::seal(&keyring, &ad, b"b@example.com").unwrap();
        let first = store.put(first).await.unwrap();
        let second = store.put(second).await.unwrap();

        assert_eq!(first, RecordId::new(1));
        assert_eq!(second, RecordId::new(2));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicates_are_all_returned() {
        let keyring = keyring();
        let ad = AssociatedData::default();
        let store = MemoryRecordStore::new();

        for _ in 0..3 {
            store.put(ProfileEntry::seal(&keyring, &ad, b"a@example.com").unwrap()).await.unwrap();
        }
        store.put(ProfileEntry::seal(&keyring, &ad, b"b@example.com").unwrap()).await.unwrap();

        let digest = keyring.digester().digest(b"a@example.com").encode();
        let found = store.find_by_digest(&digest).await.unwrap();
        let ids: Vec<u64> = found.iter().map(|r| r.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
