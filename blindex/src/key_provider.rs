//! Key provider abstraction for key provisioning.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::KeyProviderError;
use crate::keys::{KeyRole, SymmetricKeyMaterial};

/// Supplies key material for the MAC and AEAD roles at startup.
///
/// Implementations must be thread-safe (`Send + Sync`). They are consulted
/// once, before any digest or seal happens; the resulting primitives keep
/// their own copy of the key for the rest of the process.
///
/// # Example
///
/// ```rust,ignore
/// use blindex::key_provider::KeyProvider;
///
/// struct VaultAgentProvider;
///
/// impl KeyProvider for VaultAgentProvider {
///     fn load_key(
///         &self,
///         role: KeyRole,
///     ) -> Result<Option<SymmetricKeyMaterial>, KeyProviderError> {
///         // Fetch from the secret store
///     }
/// }
/// ```
pub trait KeyProvider: Send + Sync {
    /// Loads the key for `role`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the provider has no key for the role yet.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::InvalidKey` if a stored key is malformed, or
    /// `KeyProviderError::Io` if the backing storage cannot be read.
    fn load_key(&self, role: KeyRole) -> Result<Option<SymmetricKeyMaterial>, KeyProviderError>;

    /// Persists freshly generated key material.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::ReadOnly` if the provider cannot store keys
    /// (the default), or `KeyProviderError::AlreadyExists` if a key for the
    /// same role is already present.
    fn store_key(&self, material: &SymmetricKeyMaterial) -> Result<(), KeyProviderError> {
        let _ = material;
        Err(KeyProviderError::ReadOnly)
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for &P {
    fn load_key(&self, role: KeyRole) -> Result<Option<SymmetricKeyMaterial>, KeyProviderError> {
        (**self).load_key(role)
    }

    fn store_key(&self, material: &SymmetricKeyMaterial) -> Result<(), KeyProviderError> {
        (**self).store_key(material)
    }
}

/// In-process key provider.
///
/// Useful when keys arrive through some other channel at startup, and in tests.
#[derive(Debug, Default)]
pub struct MemoryKeyProvider {
    keys: RwLock<HashMap<KeyRole, SymmetricKeyMaterial>>,
}

impl MemoryKeyProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider pre-loaded with the given keys.
    #[must_use]
    pub fn with_keys(keys: impl IntoIterator<Item = SymmetricKeyMaterial>) -> Self {
        let keys = keys.into_iter().map(|k| (k.role(), k)).collect();
        Self { keys: RwLock::new(keys) }
    }
}

impl KeyProvider for MemoryKeyProvider {
    fn load_key(&self, role: KeyRole) -> Result<Option<SymmetricKeyMaterial>, KeyProviderError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.get(&role).cloned())
    }

    fn store_key(&self, material: &SymmetricKeyMaterial) -> Result<(), KeyProviderError> {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        if keys.contains_key(&material.role()) {
            return Err(KeyProviderError::AlreadyExists(material.role().to_string()));
        }
        keys.insert(material.role(), material.clone());
        drop(keys);
        Ok(())
    }
}
