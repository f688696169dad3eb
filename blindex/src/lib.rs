//! # `blindex`
//!
//! Searchable encryption for a single indexed field. The plaintext is never
//! stored; instead a keyed digest (blind index) is stored next to an
//! authenticated ciphertext of the value.
//!
//! ## Features
//!
//! - Blind indexes with HMAC-SHA256 for exact-match lookups
//! - AEAD sealing (AES-256-GCM, ChaCha20-Poly1305) bound to a fixed context
//! - Key providers for in-memory, environment and file-based key material
//! - One-shot startup provisioning that fails closed
//!
//! ## Example
//!
//! ```rust
//! use blindex::prelude::*;
//!
//! # fn main() -> Result<(), blindex::error::Error> {
//! let provider = MemoryKeyProvider::new();
//! let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };
//! let keyring = Keyring::provision(&provider, mode)?;
//! let context = AssociatedData::default();
//!
//! let index = keyring.digester().digest(b"alice@example.com").encode();
//! let sealed = keyring.cipher().seal(b"alice@example.com", &context)?;
//!
//! assert_eq!(index.as_str().len(), 44);
//! assert_eq!(keyring.cipher().open(&sealed, &context)?, b"alice@example.com");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod blind_index;
pub mod context;
pub mod encoding;
pub mod env_provider;
pub mod error;
pub mod header;
pub mod kdf;
pub mod key_provider;
pub mod keys;
pub mod provision;
pub mod vault;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::blind_index::{Digest, KeyedDigester};
    pub use crate::context::AssociatedData;
    pub use crate::encoding::EncodedDigest;
    pub use crate::env_provider::EnvKeyProvider;
    pub use crate::error::{Error, KeyProviderError};
    pub use crate::key_provider::{KeyProvider, MemoryKeyProvider};
    pub use crate::keys::{KeyAlgorithm, KeyRole, SymmetricKeyMaterial};
    pub use crate::provision::{Keyring, ProvisionMode};
    pub use crate::vault::{AuthenticatedCipher, CipherMode, SealedValue};
}
