//! Record store abstraction and backend selection.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use blindex::encoding::EncodedDigest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;
use crate::jsonl::JsonlRecordStore;
use crate::memory::MemoryRecordStore;
use crate::record::{ProfileEntry, ProfileRecord, RecordId};
use crate::sqlite::SqliteRecordStore;

/// Persistence for profile records, keyed by encoded blind index.
///
/// Implementations must store sealed bytes exactly as given and match
/// digests by exact string equality.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persists one entry and returns its new id.
    async fn put(&self, entry: ProfileEntry) -> Result<RecordId, StoreError>;

    /// Returns every record whose digest equals `digest`, oldest first.
    async fn find_by_digest(
        &self,
        digest: &EncodedDigest,
    ) -> Result<Vec<ProfileRecord>, StoreError>;
}

/// Backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process, lost on exit.
    Memory,
    /// SQLite database file.
    Sqlite {
        /// Database path.
        path: PathBuf,
    },
    /// Append-only JSON lines file.
    Jsonl {
        /// File path.
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite { path: PathBuf::from("./blindex.db") }
    }
}

impl StoreConfig {
    /// Short backend name for logs.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite { .. } => "sqlite",
            Self::Jsonl { .. } => "jsonl",
        }
    }
}

/// Opens the configured backend.
///
/// # Errors
///
/// Returns `StoreError` if the backend cannot be opened or its existing
/// contents cannot be read.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryRecordStore::new()),
        StoreConfig::Sqlite { path } => {
            let path = path.clone();
            Arc::new(tokio::task::spawn_blocking(move || SqliteRecordStore::open(&path)).await??)
        }
        StoreConfig::Jsonl { path } => Arc::new(JsonlRecordStore::open(path).await?),
    };

    info!(backend = config.backend_name(), "record store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sqlite() {
        assert_eq!(StoreConfig::default().backend_name(), "sqlite");
    }

    #[test]
    fn test_config_deserializes_tagged() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"backend":"jsonl","path":"/tmp/profiles.jsonl"}"#).unwrap();
        assert_eq!(config, StoreConfig::Jsonl { path: PathBuf::from("/tmp/profiles.jsonl") });

        let config: StoreConfig = serde_json::from_str(r#"{"backend":"memory"}"#).unwrap();
        assert_eq!(config, StoreConfig::Memory);
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&StoreConfig::Memory).await.unwrap();
        let digest = EncodedDigest::parse("A".repeat(43) + "=").unwrap();
        assert!(store.find_by_digest(&digest).await.unwrap().is_empty());
    }
}
