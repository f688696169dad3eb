//! Append-only JSON lines record store.
//!
//! Every profile is one JSON document per line:
//!
//! ```text
//! {"id":1,"email_hash":"q8b0...=","email_enc":"AQJ...","created_at":"2024-05-01T10:00:00Z"}
//! ```
//!
//! The whole file is indexed in memory at open; puts append and flush.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use blindex::encoding::EncodedDigest;
use blindex::vault::SealedValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::record::{ProfileEntry, ProfileRecord, RecordId};
use crate::store::RecordStore;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    id: RecordId,
    email_hash: String,
    email_enc: String,
    created_at: DateTime<Utc>,
}

impl Document {
    fn from_record(record: &ProfileRecord) -> Self {
        Self {
            id: record.id(),
            email_hash: record.digest().as_str().to_string(),
            email_enc: STANDARD.encode(record.sealed().as_bytes()),
            created_at: record.created_at(),
        }
    }

    fn into_record(self) -> Result<ProfileRecord, String> {
        let digest = EncodedDigest::parse(self.email_hash).map_err(|e| e.to_string())?;
        let sealed = STANDARD.decode(self.email_enc).map_err(|e| format!("email_enc: {e}"))?;
        Ok(ProfileRecord::new(self.id, digest, SealedValue::from_bytes(sealed), self.created_at))
    }
}

struct State {
    file: File,
    records: Vec<ProfileRecord>,
    by_digest: HashMap<EncodedDigest, Vec<usize>>,
    next_id: u64,
}

impl State {
    fn index(&mut self, record: ProfileRecord) {
        self.by_digest.entry(record.digest().clone()).or_default().push(self.records.len());
        self.records.push(record);
    }

    /// Hands out the next id. An id is consumed even if the write using it
    /// fails, so no two documents ever share one.
    fn reserve_id(&mut self) -> Result<RecordId, StoreError> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend("record ids exhausted".to_string()))?;
        Ok(RecordId::new(id))
    }

    /// Appends and syncs one document, then indexes it.
    ///
    /// A failed write is cut back to the previous file length, so the file
    /// and the index agree.
    fn append(&mut self, record: ProfileRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&Document::from_record(&record))?;
        line.push(b'\n');

        let len = self.file.metadata()?.len();
        if let Err(e) = write_synced(&mut self.file, &line) {
            if let Err(rollback) = self.file.set_len(len) {
                warn!(error = %rollback, "failed to truncate partial document");
            }
            return Err(e.into());
        }

        self.index(record);
        Ok(())
    }
}

fn write_synced(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line)?;
    file.sync_data()
}

/// Record store kept in a JSON lines file.
pub struct JsonlRecordStore {
    path: PathBuf,
    state: Arc<Mutex<State>>,
}

impl JsonlRecordStore {
    /// Opens `path`, creating it if missing, and loads existing documents.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read or created, and
    /// `StoreError::CorruptRecord` if a line is not a valid document.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        let file = file.into_std().await;
        let mut state =
            State { file, records: Vec::new(), by_digest: HashMap::new(), next_id: 1 };

        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let corrupt = |reason: String| {
                StoreError::CorruptRecord(format!("{}:{}: {reason}", path.display(), number + 1))
            };

            let record = serde_json::from_str::<Document>(line)
                .map_err(|e| e.to_string())
                .and_then(Document::into_record)
                .map_err(corrupt)?;
            let after = record
                .id()
                .get()
                .checked_add(1)
                .ok_or_else(|| corrupt(format!("id {} out of range", record.id())))?;

            state.next_id = state.next_id.max(after);
            state.index(record);
        }

        info!(
            path = %path.display(),
            records = state.records.len(),
            "opened jsonl record store"
        );
        Ok(Self { path, state: Arc::new(Mutex::new(state)) })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn put(&self, entry: ProfileEntry) -> Result<RecordId, StoreError> {
        let (digest, sealed) = entry.into_parts();
        let mut state = Arc::clone(&self.state).lock_owned().await;

        // Once spawned, the append finishes and releases the lock even if
        // this future is dropped.
        let id = tokio::task::spawn_blocking(move || {
            let id = state.reserve_id()?;
            state.append(ProfileRecord::new(id, digest, sealed, Utc::now()))?;
            Ok::<_, StoreError>(id)
        })
        .await??;

        debug!(%id, "appended profile document");
        Ok(id)
    }

    async fn find_by_digest(
        &self,
        digest: &EncodedDigest,
    ) -> Result<Vec<ProfileRecord>, StoreError> {
        let state = self.state.lock().await;
        let found = state
            .by_digest
            .get(digest)
            .map(|positions| positions.iter().map(|&p| state.records[p].clone()).collect())
            .unwrap_or_default();
        Ok(found)
    }
}
