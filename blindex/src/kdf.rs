//! Role key derivation using HKDF (HMAC-based Key Derivation Function).
//!
//! A deployment that only has a single master secret can derive independent
//! MAC and AEAD keys from it. The algorithm name goes into the HKDF `info`
//! parameter, so the derived keys never coincide.

use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;

use crate::error::Error;
use crate::keys::{KeyAlgorithm, SymmetricKeyMaterial};

/// Minimum master secret size in bytes.
pub const MIN_MASTER_KEY_SIZE: usize = 32;

/// Derives the key for `algorithm` from a master secret.
///
/// The derivation is `HKDF-SHA256(ikm = master, info = "blindex|<algorithm>|v1")`.
///
/// # Errors
///
/// Returns `Error::KeyUnavailable` if the master secret is empty,
/// `Error::PrimitiveConstructionFailed` if it is shorter than
/// [`MIN_MASTER_KEY_SIZE`] or the expansion fails.
///
/// # Example
///
/// ```
/// use blindex::kdf::derive_role_key;
/// use blindex::keys::KeyAlgorithm;
/// use secrecy::SecretVec;
///
/// let master = SecretVec::new(vec![0u8; 32]);
/// let mac_key = derive_role_key(&master, KeyAlgorithm::HmacSha256).expect("derivation failed");
/// assert_eq!(mac_key.algorithm(), KeyAlgorithm::HmacSha256);
/// ```
pub fn derive_role_key(
    master: &SecretVec<u8>,
    algorithm: KeyAlgorithm,
) -> Result<SymmetricKeyMaterial, Error> {
    let ikm = master.expose_secret();
    if ikm.is_empty() {
        return Err(Error::KeyUnavailable(algorithm.role()));
    }
    if ikm.len() < MIN_MASTER_KEY_SIZE {
        return Err(Error::PrimitiveConstructionFailed(format!(
            "master key must be at least {MIN_MASTER_KEY_SIZE} bytes, got {}",
            ikm.len()
        )));
    }

    let hkdf = Hkdf::<Sha256>::new(None, ikm);
    let info = format!("blindex|{}|v1", algorithm.name());

    let mut okm = vec![0u8; algorithm.key_len()];
    hkdf.expand(info.as_bytes(), &mut okm)
        .map_err(|e| Error::PrimitiveConstructionFailed(format!("HKDF expand failed: {e}")))?;

    SymmetricKeyMaterial::new(algorithm, okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_deterministic() {
        let master = SecretVec::new(vec![1u8; 32]);

        let k1 = derive_role_key(&master, KeyAlgorithm::HmacSha256).unwrap();
        let k2 = derive_role_key(&master, KeyAlgorithm::HmacSha256).unwrap();

        assert_eq!(k1.secret().expose_secret(), k2.secret().expose_secret());
    }

    #[test]
    fn test_derive_roles_differ() {
        let master = SecretVec::new(vec![1u8; 32]);

        let mac = derive_role_key(&master, KeyAlgorithm::HmacSha256).unwrap();
        let aead = derive_role_key(&master, KeyAlgorithm::Aes256Gcm).unwrap();

        assert_ne!(mac.secret().expose_secret(), aead.secret().expose_secret());
    }

    #[test]
    fn test_derive_different_masters() {
        let a = derive_role_key(&SecretVec::new(vec![1u8; 32]), KeyAlgorithm::Aes256Gcm).unwrap();
        let b = derive_role_key(&SecretVec::new(vec![2u8; 32]), KeyAlgorithm::Aes256Gcm).unwrap();

        assert_ne!(a.secret().expose_secret(), b.secret().expose_secret());
    }

    #[test]
    fn test_derive_rejects_short_master() {
        let result = derive_role_key(&SecretVec::new(vec![1u8; 8]), KeyAlgorithm::HmacSha256);
        assert!(matches!(result, Err(Error::PrimitiveConstructionFailed(_))));

        let result = derive_role_key(&SecretVec::new(Vec::new()), KeyAlgorithm::HmacSha256);
        assert!(matches!(result, Err(Error::KeyUnavailable(_))));
    }

    // RFC 5869 Test Vector (using HKDF-SHA256)
    // https://tools.ietf.org/html/rfc5869#appendix-A.1
    #[test]
    fn test_hkdf_rfc5869_test_case_1() {
        const IKM_HEX: &str = "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b";
        const SALT_HEX: &str = "000102030405060708090a0b0c";
        const INFO_HEX: &str = "f0f1f2f3f4f5f6f7f8f9";
        const EXPECTED_OKM_HEX: &str =
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865";

        let ikm = hex::decode(IKM_HEX).unwrap();
        let salt = hex::decode(SALT_HEX).unwrap();
        let info = hex::decode(INFO_HEX).unwrap();
        let expected_okm = hex::decode(EXPECTED_OKM_HEX).unwrap();

        let hkdf = Hkdf::<Sha256>::new(Some(&salt), &ikm);
        let mut okm = vec![0u8; 42];
        hkdf.expand(&info, &mut okm).expect("HKDF expand failed");

        assert_eq!(okm, expected_okm);
    }
}
