//! SQLite record store.
//!
//! One `profile` table holds the sealed value next to its blind index, with
//! a secondary index on the digest column for exact-match lookups.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use blindex::encoding::EncodedDigest;
use blindex::vault::SealedValue;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::record::{ProfileEntry, ProfileRecord, RecordId};
use crate::store::RecordStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS profile (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email_enc BLOB NOT NULL,
        email_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_email_hash ON profile(email_hash);
";

/// Record store backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Opens or creates a database at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the database cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        info!(path = %path.display(), "opened sqlite record store");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Opens a private in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn insert(&self, digest: &EncodedDigest, sealed: &SealedValue) -> Result<RecordId, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO profile (email_enc, email_hash, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?3)",
            params![sealed.as_bytes(), digest.as_str(), now],
        )?;
        to_record_id(conn.last_insert_rowid())
    }

    fn select(&self, digest: &EncodedDigest) -> Result<Vec<ProfileRecord>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT id, email_enc, email_hash, created_at FROM profile \
             WHERE email_hash = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![digest.as_str()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, sealed, hash, created_at)| {
                Ok(ProfileRecord::new(
                    to_record_id(id)?,
                    EncodedDigest::parse(hash)
                        .map_err(|e| StoreError::CorruptRecord(format!("row {id}: {e}")))?,
                    SealedValue::from_bytes(sealed),
                    parse_timestamp(&created_at)
                        .map_err(|e| StoreError::CorruptRecord(format!("row {id}: {e}")))?,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn put(&self, entry: ProfileEntry) -> Result<RecordId, StoreError> {
        let store = self.clone();
        let id = tokio::task::spawn_blocking(move || {
            let (digest, sealed) = entry.into_parts();
            store.insert(&digest, &sealed)
        })
        .await??;

        debug!(%id, "inserted profile row");
        Ok(id)
    }

    async fn find_by_digest(
        &self,
        digest: &EncodedDigest,
    ) -> Result<Vec<ProfileRecord>, StoreError> {
        let store = self.clone();
        let digest = digest.clone();
        tokio::task::spawn_blocking(move || store.select(&digest)).await?
    }
}

fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn to_record_id(rowid: i64) -> Result<RecordId, StoreError> {
    u64::try_from(rowid)
        .map(RecordId::new)
        .map_err(|_| StoreError::CorruptRecord(format!("negative row id {rowid}")))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|t| t.with_timezone(&Utc))
}
