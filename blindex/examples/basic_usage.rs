//! Basic usage example for `blindex`.

use blindex::prelude::*;
use blindex_key_file::FileKeyProvider;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("blindex Basic Usage Example");
    println!("===========================\n");

    // Setup: a key directory next to the working directory
    let key_dir = PathBuf::from("./example_keys");

    // Create missing keys; existing ones are kept
    let provider = FileKeyProvider::init(&key_dir, KeyAlgorithm::Aes256Gcm)?;
    println!("✓ Key directory ready at {}\n", key_dir.display());

    // Provision once, then share the keyring
    let keyring = Keyring::provision(&provider, ProvisionMode::Strict)?;
    println!("✓ Keyring provisioned ({:?})\n", keyring.cipher().mode());

    let context = AssociatedData::default();
    println!("Associated data: {context}\n");

    // Write path
    let plaintext = b"alice@example.com";
    let index = keyring.digester().digest(plaintext).encode();
    let sealed = keyring.cipher().seal(plaintext, &context)?;
    println!("Blind index: {index}");
    println!("✓ Sealed ({} bytes)\n", sealed.len());

    // Lookup path
    let query = keyring.digester().digest(b"alice@example.com").encode();
    assert_eq!(index, query);
    println!("✓ Lookup digest matches");

    let opened = keyring.cipher().open(&sealed, &context)?;
    assert_eq!(plaintext, &opened[..]);
    println!("✓ Opened: {}\n", String::from_utf8_lossy(&opened));

    // Other addresses do not collide
    let other = keyring.digester().digest(b"bob@example.com").encode();
    assert_ne!(index, other);
    println!("✓ Different values produce different indexes\n");

    println!("Note: Key directory at {} can be deleted manually", key_dir.display());

    Ok(())
}
