//! Key provider backed by environment variables.
//!
//! Keys are given either per role as standard base64, or as a single master
//! secret from which both role keys are derived (see [`crate::kdf`]). An
//! explicit role key always wins over derivation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString, SecretVec};
use zeroize::Zeroizing;

use crate::error::KeyProviderError;
use crate::kdf::derive_role_key;
use crate::key_provider::KeyProvider;
use crate::keys::{KeyAlgorithm, KeyRole, SymmetricKeyMaterial};

/// Base64 MAC key.
pub const MAC_KEY_VAR: &str = "BLINDEX_MAC_KEY";
/// Base64 AEAD key.
pub const AEAD_KEY_VAR: &str = "BLINDEX_AEAD_KEY";
/// AEAD algorithm name, defaults to `aes-256-gcm`.
pub const AEAD_ALGORITHM_VAR: &str = "BLINDEX_AEAD_ALGORITHM";
/// Base64 master secret for HKDF derivation.
pub const MASTER_KEY_VAR: &str = "BLINDEX_MASTER_KEY";

/// Read-only provider for keys handed in through the environment.
pub struct EnvKeyProvider {
    mac_key: Option<SecretString>,
    aead_key: Option<SecretString>,
    master_key: Option<SecretString>,
    aead_algorithm: KeyAlgorithm,
}

impl EnvKeyProvider {
    /// Captures the relevant variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::InvalidKey` if the AEAD algorithm name is unknown.
    pub fn from_env() -> Result<Self, KeyProviderError> {
        Self::from_vars(std::env::vars())
    }

    /// Captures the relevant variables from an explicit list.
    ///
    /// Unrelated variables are ignored; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::InvalidKey` if the AEAD algorithm name is unknown.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, KeyProviderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut provider = Self {
            mac_key: None,
            aead_key: None,
            master_key: None,
            aead_algorithm: KeyAlgorithm::default(),
        };

        for (name, value) in vars {
            let value: String = value.into();
            if value.trim().is_empty() {
                continue;
            }
            match name.as_ref() {
                MAC_KEY_VAR => provider.mac_key = Some(SecretString::new(value)),
                AEAD_KEY_VAR => provider.aead_key = Some(SecretString::new(value)),
                MASTER_KEY_VAR => provider.master_key = Some(SecretString::new(value)),
                AEAD_ALGORITHM_VAR => {
                    provider.aead_algorithm = value.parse().map_err(|e| {
                        KeyProviderError::InvalidKey(format!("{AEAD_ALGORITHM_VAR}: {e}"))
                    })?;
                }
                _ => {}
            }
        }

        if provider.aead_algorithm.role() != KeyRole::Aead {
            return Err(KeyProviderError::InvalidKey(format!(
                "{AEAD_ALGORITHM_VAR}: {} is not an AEAD",
                provider.aead_algorithm.name()
            )));
        }

        Ok(provider)
    }

    /// Returns `true` if any key variable was set.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.mac_key.is_some() || self.aead_key.is_some() || self.master_key.is_some()
    }

    fn algorithm_for(&self, role: KeyRole) -> KeyAlgorithm {
        match role {
            KeyRole::Mac => KeyAlgorithm::HmacSha256,
            KeyRole::Aead => self.aead_algorithm,
        }
    }
}

impl KeyProvider for EnvKeyProvider {
    fn load_key(&self, role: KeyRole) -> Result<Option<SymmetricKeyMaterial>, KeyProviderError> {
        let algorithm = self.algorithm_for(role);
        let (explicit, var) = match role {
            KeyRole::Mac => (&self.mac_key, MAC_KEY_VAR),
            KeyRole::Aead => (&self.aead_key, AEAD_KEY_VAR),
        };

        if let Some(encoded) = explicit {
            let bytes = Zeroizing::new(
                STANDARD
                    .decode(encoded.expose_secret().trim())
                    .map_err(|_| not_base64(var))?,
            );
            let key = SymmetricKeyMaterial::new(algorithm, bytes.to_vec())
                .map_err(|e| KeyProviderError::InvalidKey(format!("{var}: {e}")))?;
            return Ok(Some(key));
        }

        if let Some(encoded) = &self.master_key {
            let master = SecretVec::new(
                STANDARD
                    .decode(encoded.expose_secret().trim())
                    .map_err(|_| not_base64(MASTER_KEY_VAR))?,
            );
            let key = derive_role_key(&master, algorithm)
                .map_err(|e| KeyProviderError::InvalidKey(format!("{MASTER_KEY_VAR}: {e}")))?;
            return Ok(Some(key));
        }

        Ok(None)
    }
}

fn not_base64(var: &str) -> KeyProviderError {
    KeyProviderError::InvalidKey(format!("{var}: not valid base64"))
}
