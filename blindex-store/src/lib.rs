//! # `blindex-store`
//!
//! Record stores for blind-indexed profiles and the service that ties them
//! to a [`blindex::provision::Keyring`].
//!
//! Three backends ship with the crate:
//!
//! - [`MemoryRecordStore`]: in-process, for tests and the interactive shell
//! - [`SqliteRecordStore`]: a `profile` table with an index on the digest
//! - [`JsonlRecordStore`]: one JSON document per line
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use blindex::prelude::*;
//! use blindex_store::{MemoryRecordStore, ProfileService};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };
//! let keyring = Keyring::provision(&MemoryKeyProvider::new(), mode)?;
//! let service = ProfileService::new(keyring, Arc::new(MemoryRecordStore::new()));
//!
//! service.write_profile(b"alice@example.com").await?;
//! assert_eq!(service.find_profile(b"alice@example.com").await?.len(), 1);
//! assert!(service.find_profile(b"bob@example.com").await?.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod jsonl;
pub mod memory;
pub mod record;
pub mod service;
pub mod sqlite;
pub mod store;

pub use error::{ServiceError, StoreError};
pub use jsonl::JsonlRecordStore;
pub use memory::MemoryRecordStore;
pub use record::{ProfileEntry, ProfileRecord, RecordId, RevealedProfile};
pub use service::{ProfileService, DEFAULT_STORE_TIMEOUT};
pub use sqlite::SqliteRecordStore;
pub use store::{open_store, RecordStore, StoreConfig};
