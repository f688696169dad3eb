//! Integration tests for blindex with FileKeyProvider.

use blindex::prelude::*;
use blindex_key_file::FileKeyProvider;
use proptest::prelude::*;
use tempfile::TempDir;

fn file_keyring(temp_dir: &TempDir, aead: KeyAlgorithm) -> Keyring {
    let provider = FileKeyProvider::init(temp_dir.path(), aead).expect("Failed to initialize keys");
    Keyring::provision(&provider, ProvisionMode::Strict).expect("Failed to provision keyring")
}

#[test]
fn test_end_to_end_with_file_provider() {
    // Create a temporary directory for keys
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let keyring = file_keyring(&temp_dir, KeyAlgorithm::Aes256Gcm);
    let context = AssociatedData::default();

    // Write path: digest and seal the same plaintext
    let plaintext = b"alice@example.com";
    let index = keyring.digester().digest(plaintext).encode();
    let sealed = keyring.cipher().seal(plaintext, &context).expect("Sealing failed");

    // Lookup path: recompute the digest from the query
    let query = keyring.digester().digest(b"alice@example.com").encode();
    assert_eq!(index, query);

    let opened = keyring.cipher().open(&sealed, &context).expect("Opening failed");
    assert_eq!(plaintext, &opened[..]);

    // A different address does not match
    let miss = keyring.digester().digest(b"bob@example.com").encode();
    assert_ne!(index, miss);
}

#[test]
fn test_keys_survive_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let context = AssociatedData::default();

    let first = file_keyring(&temp_dir, KeyAlgorithm::ChaCha20Poly1305);
    let sealed = first.cipher().seal(b"alice@example.com", &context).expect("Sealing failed");

    // Re-open the same directory as a fresh process would
    let provider = FileKeyProvider::new(temp_dir.path()).expect("Failed to create provider");
    let second = Keyring::provision(&provider, ProvisionMode::Strict).expect("Provision failed");

    assert_eq!(
        first.digester().digest(b"alice@example.com"),
        second.digester().digest(b"alice@example.com")
    );
    assert_eq!(second.cipher().mode(), CipherMode::ChaCha20Poly1305);
    let opened = second.cipher().open(&sealed, &context).expect("Opening failed");
    assert_eq!(opened, b"alice@example.com");
}

#[test]
fn test_strict_provision_on_empty_dir_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let provider = FileKeyProvider::new(temp_dir.path()).expect("Failed to create provider");

    let err = Keyring::provision(&provider, ProvisionMode::Strict).unwrap_err();
    assert!(matches!(err, Error::KeyUnavailable(KeyRole::Mac)));
    assert!(err.is_startup_fatal());
}

#[test]
fn test_bootstrap_writes_key_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let provider = FileKeyProvider::new(temp_dir.path()).expect("Failed to create provider");
    let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };

    let keyring = Keyring::provision(&provider, mode).expect("Bootstrap failed");

    assert!(provider.key_path(KeyRole::Mac).exists());
    assert!(provider.key_path(KeyRole::Aead).exists());

    let again = Keyring::provision(&provider, ProvisionMode::Strict).expect("Provision failed");
    assert_eq!(keyring.digester().key_id(), again.digester().key_id());
    assert_eq!(keyring.cipher().key_id(), again.cipher().key_id());
}

#[test]
fn test_key_isolation() {
    // Two independent deployments
    let dir_a = TempDir::new().expect("Failed to create temp dir");
    let dir_b = TempDir::new().expect("Failed to create temp dir");
    let a = file_keyring(&dir_a, KeyAlgorithm::Aes256Gcm);
    let b = file_keyring(&dir_b, KeyAlgorithm::Aes256Gcm);
    let context = AssociatedData::default();

    // Digests under different keys differ
    assert_ne!(
        a.digester().digest(b"alice@example.com"),
        b.digester().digest(b"alice@example.com")
    );

    // Values sealed by one deployment cannot be opened by the other
    let sealed = a.cipher().seal(b"alice@example.com", &context).expect("Sealing failed");
    assert!(matches!(b.cipher().open(&sealed, &context), Err(Error::AuthenticationFailed)));
}

#[test]
fn test_context_binding() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let keyring = file_keyring(&temp_dir, KeyAlgorithm::Aes256Gcm);

    let v1 = AssociatedData::for_field("profile", "email", 1);
    let v2 = AssociatedData::for_field("profile", "email", 2);
    assert_eq!(v1, AssociatedData::default());

    let sealed = keyring.cipher().seal(b"alice@example.com", &v1).expect("Sealing failed");
    assert!(matches!(keyring.cipher().open(&sealed, &v2), Err(Error::AuthenticationFailed)));

    // Digests do not depend on the context
    let index = keyring.digester().digest(b"alice@example.com");
    assert_eq!(index.encode().as_str().len(), blindex::encoding::ENCODED_DIGEST_LEN);
}

#[test]
fn test_encoded_digest_survives_store_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let keyring = file_keyring(&temp_dir, KeyAlgorithm::Aes256Gcm);

    let digest = keyring.digester().digest(b"alice@example.com");
    let stored = digest.encode().into_string();

    let parsed = EncodedDigest::parse(stored).expect("Stored digest should parse");
    assert_eq!(parsed.decode().expect("Decoding failed"), digest);
}

fn memory_keyring() -> Keyring {
    let provider = MemoryKeyProvider::with_keys([
        SymmetricKeyMaterial::generate(KeyAlgorithm::HmacSha256),
        SymmetricKeyMaterial::generate(KeyAlgorithm::Aes256Gcm),
    ]);
    Keyring::provision(&provider, ProvisionMode::Strict).expect("Provision failed")
}

proptest! {
    #[test]
    fn prop_digest_is_deterministic(value in proptest::collection::vec(any::<u8>(), 0..256)) {
        let keyring = memory_keyring();
        let clone = keyring.clone();
        prop_assert_eq!(keyring.digester().digest(&value), clone.digester().digest(&value));
    }

    #[test]
    fn prop_distinct_values_have_distinct_digests(
        a in "[a-z]{1,16}@example\\.com",
        b in "[a-z]{1,16}@example\\.com",
    ) {
        prop_assume!(a != b);
        let keyring = memory_keyring();
        let digester = keyring.digester();
        prop_assert_ne!(digester.digest(a.as_bytes()), digester.digest(b.as_bytes()));
    }

    #[test]
    fn prop_seal_open_round_trip(value in proptest::collection::vec(any::<u8>(), 0..512)) {
        let keyring = memory_keyring();
        let context = AssociatedData::default();

        let first = keyring.cipher().seal(&value, &context).unwrap();
        let second = keyring.cipher().seal(&value, &context).unwrap();
        prop_assert_ne!(&first, &second);

        prop_assert_eq!(keyring.cipher().open(&first, &context).unwrap(), value.clone());
        prop_assert_eq!(keyring.cipher().open(&second, &context).unwrap(), value);
    }
}
