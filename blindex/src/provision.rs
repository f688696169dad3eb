//! One-time key provisioning at process start.
//!
//! [`Keyring::provision`] either returns a fully working digester and cipher
//! or an error; there is no partially initialised state. Callers are expected
//! to refuse traffic when it fails.

use tracing::{info, warn};

use crate::blind_index::KeyedDigester;
use crate::error::{Error, KeyProviderError};
use crate::key_provider::KeyProvider;
use crate::keys::{KeyAlgorithm, KeyRole, SymmetricKeyMaterial};
use crate::vault::AuthenticatedCipher;

/// What to do when the provider has no key for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionMode {
    /// Missing keys are fatal.
    #[default]
    Strict,
    /// Missing keys are generated and handed to the provider for storage.
    ///
    /// Meant for development and first-run bootstrap.
    Bootstrap {
        /// Algorithm for a generated AEAD key.
        aead_algorithm: KeyAlgorithm,
    },
}

/// The digester and cipher of a process, built together.
///
/// Cheap to clone; share one instance between all write and lookup paths.
#[derive(Debug, Clone)]
pub struct Keyring {
    digester: KeyedDigester,
    cipher: AuthenticatedCipher,
}

impl Keyring {
    /// Pairs an existing digester and cipher.
    #[must_use]
    pub const fn new(digester: KeyedDigester, cipher: AuthenticatedCipher) -> Self {
        Self { digester, cipher }
    }

    /// Builds both primitives from the provider's keys.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyUnavailable` if a key is missing in strict mode,
    /// `Error::PrimitiveConstructionFailed` if a key cannot drive its primitive,
    /// and `Error::KeyProvider` if the provider fails.
    pub fn provision<P: KeyProvider + ?Sized>(
        provider: &P,
        mode: ProvisionMode,
    ) -> Result<Self, Error> {
        let mac_key = obtain_key(provider, KeyRole::Mac, mode)?;
        let aead_key = obtain_key(provider, KeyRole::Aead, mode)?;

        let digester = KeyedDigester::new(&mac_key)?;
        let cipher = AuthenticatedCipher::new(&aead_key)?;

        info!(
            mac = mac_key.algorithm().tag(),
            mac_key_id = mac_key.key_id(),
            aead = aead_key.algorithm().tag(),
            aead_key_id = aead_key.key_id(),
            "keyring provisioned"
        );

        Ok(Self { digester, cipher })
    }

    /// Returns the blind index digester.
    #[must_use]
    pub const fn digester(&self) -> &KeyedDigester {
        &self.digester
    }

    /// Returns the field cipher.
    #[must_use]
    pub const fn cipher(&self) -> &AuthenticatedCipher {
        &self.cipher
    }
}

fn obtain_key<P: KeyProvider + ?Sized>(
    provider: &P,
    role: KeyRole,
    mode: ProvisionMode,
) -> Result<SymmetricKeyMaterial, Error> {
    if let Some(key) = provider.load_key(role)? {
        if key.role() != role {
            return Err(Error::PrimitiveConstructionFailed(format!(
                "provider returned a {} key for the {role} slot",
                key.algorithm().tag()
            )));
        }
        return Ok(key);
    }

    let ProvisionMode::Bootstrap { aead_algorithm } = mode else {
        return Err(Error::KeyUnavailable(role));
    };

    let algorithm = match role {
        KeyRole::Mac => KeyAlgorithm::HmacSha256,
        KeyRole::Aead => aead_algorithm,
    };
    if algorithm.role() != role {
        return Err(Error::PrimitiveConstructionFailed(format!(
            "cannot bootstrap the {role} with {}",
            algorithm.tag()
        )));
    }

    let key = SymmetricKeyMaterial::generate(algorithm);
    match provider.store_key(&key) {
        Ok(()) => info!(%role, key_id = key.key_id(), "generated and stored new key"),
        Err(KeyProviderError::ReadOnly) => {
            warn!(
                %role,
                key_id = key.key_id(),
                "generated ephemeral key; provider cannot persist it"
            );
        }
        Err(e) => return Err(e.into()),
    }

    Ok(key)
}
