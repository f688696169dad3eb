//! One-shot subcommands.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use blindex::key_provider::KeyProvider;
use blindex::keys::{KeyAlgorithm, KeyRole};
use blindex_key_file::FileKeyProvider;
use blindex_store::ProfileService;

/// Creates any missing key files in `output` and prints their ids.
pub fn keygen(output: &Path, aead: KeyAlgorithm, out: &mut impl Write) -> Result<()> {
    let provider = FileKeyProvider::init(output, aead)
        .with_context(|| format!("failed to initialise key directory {}", output.display()))?;

    writeln!(out, "Key directory: {}", provider.key_dir().display())?;
    for role in [KeyRole::Mac, KeyRole::Aead] {
        let key = provider
            .load_key(role)?
            .with_context(|| format!("{role} missing after initialisation"))?;
        writeln!(
            out,
            "  {:<5} {} (key id {:08x})",
            role.as_str(),
            key.algorithm().tag(),
            key.key_id()
        )?;
    }
    Ok(())
}

/// Writes one profile.
pub async fn add(service: &ProfileService, email: &str, out: &mut impl Write) -> Result<()> {
    let id = service.write_profile(email.as_bytes()).await.context("failed to add profile")?;
    writeln!(out, "Added profile {id}")?;
    Ok(())
}

/// Lists matching record ids, and the opened values when `reveal` is set.
pub async fn search(
    service: &ProfileService,
    email: &str,
    reveal: bool,
    out: &mut impl Write,
) -> Result<()> {
    if reveal {
        let revealed = service.lookup(email.as_bytes()).await.context("search failed")?;
        if revealed.is_empty() {
            writeln!(out, "No matching profile")?;
        }
        for profile in revealed {
            writeln!(
                out,
                "Profile {} ({}): {}",
                profile.record.id(),
                profile.record.created_at().to_rfc3339(),
                String::from_utf8_lossy(&profile.plaintext)
            )?;
        }
        return Ok(());
    }

    let records = service.find_profile(email.as_bytes()).await.context("search failed")?;
    if records.is_empty() {
        writeln!(out, "No matching profile")?;
    }
    for record in records {
        writeln!(out, "Profile {} ({})", record.id(), record.created_at().to_rfc3339())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use blindex::key_provider::MemoryKeyProvider;
    use blindex::provision::{Keyring, ProvisionMode};
    use blindex_store::MemoryRecordStore;

    fn service() -> ProfileService {
        let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };
        let keyring = Keyring::provision(&MemoryKeyProvider::new(), mode).unwrap();
        ProfileService::new(keyring, Arc::new(MemoryRecordStore::new()))
    }

    #[test]
    fn test_keygen_prints_both_keys() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut out = Vec::new();

        keygen(&temp.path().join("keys"), KeyAlgorithm::ChaCha20Poly1305, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("MAC: HMAC-SHA256"));
        assert!(text.contains("AEAD: ChaCha20-Poly1305"));
    }

    #[tokio::test]
    async fn test_add_then_search() {
        let service = service();
        let mut out = Vec::new();

        add(&service, "alice@example.com", &mut out).await.unwrap();
        search(&service, "alice@example.com", true, &mut out).await.unwrap();
        search(&service, "bob@example.com", false, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Added profile 1");
        assert!(lines[1].starts_with("Profile 1 ("));
        assert!(lines[1].ends_with("): alice@example.com"));
        assert_eq!(lines[2], "No matching profile");
    }
}
