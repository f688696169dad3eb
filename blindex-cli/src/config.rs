//! Configuration loading and validation for the `blindex` binary.
//!
//! Values come from an optional TOML file, overridden by `BLINDEX_*`
//! environment variables (nested keys use `__`, e.g. `BLINDEX_STORE__PATH`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use blindex::context::{AssociatedData, DEFAULT_ASSOCIATED_DATA};
use blindex::keys::{KeyAlgorithm, KeyRole};
use blindex_store::StoreConfig;
use serde::Deserialize;

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "blindex.toml";

/// Validated CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory holding `mac.key` and `aead.key`.
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,

    /// Generate missing keys at startup instead of refusing to start.
    #[serde(default)]
    pub bootstrap: bool,

    /// AEAD used for generated keys.
    #[serde(default = "default_aead_algorithm")]
    pub aead_algorithm: String,

    /// Associated data every value is sealed under.
    #[serde(default = "default_associated_data")]
    pub associated_data: String,

    /// Record store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-call store timeout in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_key_dir() -> PathBuf {
    PathBuf::from("./keys")
}
fn default_aead_algorithm() -> String {
    KeyAlgorithm::Aes256Gcm.name().into()
}
fn default_associated_data() -> String {
    DEFAULT_ASSOCIATED_DATA.into()
}
fn default_store_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".into()
}

impl Settings {
    /// Loads settings from `path` (or [`DEFAULT_CONFIG_FILE`] if present)
    /// and the environment, then validates them.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, a value cannot be
    /// parsed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let cfg = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("BLINDEX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to build configuration")?;

        let settings: Self = cfg.try_deserialize().context("failed to deserialise configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.associated_data.is_empty() {
            bail!("associated_data must not be empty");
        }
        if self.store_timeout_ms == 0 {
            bail!("store_timeout_ms must be > 0");
        }
        if self.key_dir.as_os_str().is_empty() {
            bail!("key_dir must not be empty");
        }
        self.aead_algorithm()?;
        Ok(())
    }

    /// Parsed AEAD algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or not an AEAD.
    pub fn aead_algorithm(&self) -> Result<KeyAlgorithm> {
        let algorithm: KeyAlgorithm = self
            .aead_algorithm
            .parse()
            .with_context(|| format!("invalid aead_algorithm {:?}", self.aead_algorithm))?;
        if algorithm.role() != KeyRole::Aead {
            bail!("aead_algorithm must be an AEAD, got {}", algorithm.name());
        }
        Ok(algorithm)
    }

    #[must_use]
    pub fn associated_data(&self) -> AssociatedData {
        AssociatedData::from(self.associated_data.as_str())
    }

    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Replaces the configured backend, keeping its path if the kind matches.
    pub fn override_store(&mut self, kind: StoreKind) {
        self.store = match (kind, &self.store) {
            (StoreKind::Memory, _) => StoreConfig::Memory,
            (StoreKind::Sqlite, StoreConfig::Sqlite { path }) => {
                StoreConfig::Sqlite { path: path.clone() }
            }
            (StoreKind::Sqlite, _) => StoreConfig::default(),
            (StoreKind::Jsonl, StoreConfig::Jsonl { path }) => {
                StoreConfig::Jsonl { path: path.clone() }
            }
            (StoreKind::Jsonl, _) => StoreConfig::Jsonl { path: PathBuf::from("./blindex.jsonl") },
        };
    }
}

/// Backend named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKind {
    Memory,
    Sqlite,
    Jsonl,
}
