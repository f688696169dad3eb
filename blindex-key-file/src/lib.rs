//! File-based key provider for `blindex`.
//!
//! This provider stores keys in the filesystem and is suitable for
//! development, testing and single-host deployments.

#![warn(clippy::pedantic, clippy::nursery)]

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use blindex::error::KeyProviderError;
use blindex::key_provider::KeyProvider;
use blindex::keys::{KeyAlgorithm, KeyRole, SymmetricKeyMaterial};
use secrecy::ExposeSecret;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// File-based key provider.
///
/// Keys are stored in the filesystem with the following structure:
/// ```text
/// keys/               (0700 permissions)
/// ├── mac.key         (0600 permissions)
/// └── aead.key        (0600 permissions)
/// ```
///
/// Each file holds two lines: the algorithm name and the base64 key.
/// ```text
/// aes-256-gcm
/// q8b0...=
/// ```
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    key_dir: PathBuf,
}

impl FileKeyProvider {
    /// Creates a new `FileKeyProvider`.
    ///
    /// # Arguments
    ///
    /// * `key_dir` - Directory containing key files
    ///
    /// # Errors
    ///
    /// Returns error if the directory doesn't exist.
    pub fn new(key_dir: impl Into<PathBuf>) -> Result<Self, KeyProviderError> {
        let key_dir = key_dir.into();
        if !key_dir.is_dir() {
            return Err(KeyProviderError::KeyNotFound(format!(
                "key directory does not exist: {}",
                key_dir.display()
            )));
        }
        Ok(Self { key_dir })
    }

    /// Initializes a key directory with a fresh MAC key and AEAD key.
    ///
    /// Existing key files are left untouched, so running this twice is safe.
    ///
    /// # Errors
    ///
    /// Returns error if directory creation or key writing fails, or if
    /// `aead_algorithm` is not an AEAD.
    pub fn init(
        key_dir: impl Into<PathBuf>,
        aead_algorithm: KeyAlgorithm,
    ) -> Result<Self, KeyProviderError> {
        if aead_algorithm.role() != KeyRole::Aead {
            return Err(KeyProviderError::InvalidKey(format!(
                "{} is not an AEAD algorithm",
                aead_algorithm.name()
            )));
        }

        let key_dir = key_dir.into();
        fs::create_dir_all(&key_dir)?;
        restrict_dir(&key_dir)?;

        let provider = Self { key_dir };
        for algorithm in [KeyAlgorithm::HmacSha256, aead_algorithm] {
            if provider.key_path(algorithm.role()).exists() {
                debug!(role = %algorithm.role(), "key file already present");
                continue;
            }
            provider.store_key(&SymmetricKeyMaterial::generate(algorithm))?;
        }

        Ok(provider)
    }

    /// Returns the key directory.
    #[must_use]
    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Returns the path of the key file for `role`.
    #[must_use]
    pub fn key_path(&self, role: KeyRole) -> PathBuf {
        self.key_dir.join(format!("{}.key", role.as_str()))
    }
}

impl KeyProvider for FileKeyProvider {
    fn load_key(&self, role: KeyRole) -> Result<Option<SymmetricKeyMaterial>, KeyProviderError> {
        let path = self.key_path(role);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => Zeroizing::new(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let key = parse_key_file(&contents)
            .map_err(|msg| KeyProviderError::InvalidKey(format!("{}: {msg}", path.display())))?;

        if key.role() != role {
            return Err(KeyProviderError::InvalidKey(format!(
                "{}: holds a {} key, expected a {role}",
                path.display(),
                key.algorithm().tag()
            )));
        }

        Ok(Some(key))
    }

    fn store_key(&self, material: &SymmetricKeyMaterial) -> Result<(), KeyProviderError> {
        let path = self.key_path(material.role());
        let contents = Zeroizing::new(format!(
            "{}\n{}\n",
            material.algorithm().name(),
            STANDARD.encode(material.secret().expose_secret())
        ));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(KeyProviderError::AlreadyExists(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        info!(
            path = %path.display(),
            algorithm = material.algorithm().tag(),
            key_id = material.key_id(),
            "wrote key file"
        );
        Ok(())
    }
}

fn parse_key_file(contents: &str) -> Result<SymmetricKeyMaterial, String> {
    let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());
    let name = lines.next().ok_or("empty key file")?;
    let encoded = lines.next().ok_or("missing key line")?;
    if lines.next().is_some() {
        return Err("unexpected trailing content".to_string());
    }

    let algorithm: KeyAlgorithm = name.parse().map_err(|e| format!("{e}"))?;
    let bytes = STANDARD.decode(encoded).map_err(|_| "key is not valid base64")?;
    SymmetricKeyMaterial::new(algorithm, bytes).map_err(|e| e.to_string())
}

#[cfg(unix)]
fn restrict_dir(dir: &Path) -> Result<(), KeyProviderError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_dir(_dir: &Path) -> Result<(), KeyProviderError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_requires_existing_dir() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(FileKeyProvider::new(missing), Err(KeyProviderError::KeyNotFound(_))));
    }

    #[test]
    fn test_init_creates_both_keys() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keys");

        let provider = FileKeyProvider::init(&dir, KeyAlgorithm::Aes256Gcm).unwrap();

        let mac = provider.load_key(KeyRole::Mac).unwrap().unwrap();
        let aead = provider.load_key(KeyRole::Aead).unwrap().unwrap();
        assert_eq!(mac.algorithm(), KeyAlgorithm::HmacSha256);
        assert_eq!(aead.algorithm(), KeyAlgorithm::Aes256Gcm);
    }

    #[test]
    fn test_init_is_idempotent() {
        let temp = TempDir::new().unwrap();

        let provider = FileKeyProvider::init(temp.path(), KeyAlgorithm::Aes256Gcm).unwrap();
        let before = provider.load_key(KeyRole::Aead).unwrap().unwrap().key_id();

        let provider = FileKeyProvider::init(temp.path(), KeyAlgorithm::ChaCha20Poly1305).unwrap();
        let after = provider.load_key(KeyRole::Aead).unwrap().unwrap();

        assert_eq!(before, after.key_id());
        assert_eq!(after.algorithm(), KeyAlgorithm::Aes256Gcm);
    }

    #[test]
    fn test_init_rejects_mac_as_aead() {
        let temp = TempDir::new().unwrap();
        let result = FileKeyProvider::init(temp.path(), KeyAlgorithm::HmacSha256);
        assert!(matches!(result, Err(KeyProviderError::InvalidKey(_))));
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let provider = FileKeyProvider::new(temp.path()).unwrap();
        assert!(provider.load_key(KeyRole::Mac).unwrap().is_none());
    }

    #[test]
    fn test_store_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let provider = FileKeyProvider::init(temp.path(), KeyAlgorithm::Aes256Gcm).unwrap();

        let result = provider.store_key(&SymmetricKeyMaterial::generate(KeyAlgorithm::HmacSha256));
        assert!(matches!(result, Err(KeyProviderError::AlreadyExists(_))));
    }

    #[test]
    fn test_corrupt_file_is_invalid() {
        let temp = TempDir::new().unwrap();
        let provider = FileKeyProvider::new(temp.path()).unwrap();
        fs::write(provider.key_path(KeyRole::Mac), "hmac-sha256\nc2VjcmV0!a2V5\n").unwrap();

        let message = match provider.load_key(KeyRole::Mac) {
            Err(KeyProviderError::InvalidKey(message)) => message,
            other => panic!("expected invalid key, got {:?}", other.map(|k| k.is_some())),
        };
        assert!(message.contains("not valid base64"));
        assert!(!message.contains("offset"));
        assert!(!message.contains("symbol"));
    }

    #[test]
    fn test_role_mismatch_is_invalid() {
        let temp = TempDir::new().unwrap();
        let provider = FileKeyProvider::new(temp.path()).unwrap();
        let aead = SymmetricKeyMaterial::generate(KeyAlgorithm::Aes256Gcm);
        let contents = format!("aes-256-gcm\n{}\n", STANDARD.encode(aead.secret().expose_secret()));
        fs::write(provider.key_path(KeyRole::Mac), contents).unwrap();

        assert!(matches!(provider.load_key(KeyRole::Mac), Err(KeyProviderError::InvalidKey(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let provider =
            FileKeyProvider::init(temp.path().join("k"), KeyAlgorithm::Aes256Gcm).unwrap();

        let mode = fs::metadata(provider.key_path(KeyRole::Aead)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let dir_mode = fs::metadata(provider.key_dir()).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}
