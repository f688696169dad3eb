//! `blindex` CLI: key generation and encrypted profile search.

#![warn(clippy::pedantic, clippy::nursery)]

mod commands;
mod config;
mod shell;
mod telemetry;

use std::path::PathBuf;

use anyhow::{Context, Result};
use blindex::env_provider::EnvKeyProvider;
use blindex::key_provider::KeyProvider;
use blindex::keys::KeyAlgorithm;
use blindex::provision::{Keyring, ProvisionMode};
use blindex_key_file::FileKeyProvider;
use blindex_store::{open_store, ProfileService};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{Settings, StoreKind};

#[derive(Parser)]
#[command(name = "blindex")]
#[command(about = "Searchable encryption for profile emails", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./blindex.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Record store backend, overriding the configuration
    #[arg(short, long, global = true, value_enum)]
    store: Option<StoreKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new keys
    Keygen {
        /// Output directory for keys
        #[arg(short, long, default_value = "./keys")]
        output: PathBuf,
        /// AEAD algorithm for the sealing key
        #[arg(long, default_value = "aes-256-gcm")]
        aead: KeyAlgorithm,
    },
    #[command(flatten)]
    Profile(ProfileCommand),
}

/// Commands that need provisioned keys and an open store.
#[derive(Subcommand)]
enum ProfileCommand {
    /// Encrypt and store a profile email
    Add {
        /// Email address
        email: String,
    },
    /// Find profiles by email
    Search {
        /// Email address
        email: String,
        /// Decrypt and print matching values
        #[arg(long)]
        reveal: bool,
    },
    /// Interactive shell
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Keygen { output, aead } => {
            telemetry::init_tracing("info")?;
            commands::keygen(&output, aead, &mut stdout)
        }
        Commands::Profile(command) => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            if let Some(kind) = cli.store {
                settings.override_store(kind);
            }
            telemetry::init_tracing(&settings.log_level)?;

            let service = start(&settings).await?;
            run(&service, command, &mut stdout).await
        }
    }
}

async fn run(
    service: &ProfileService,
    command: ProfileCommand,
    stdout: &mut std::io::Stdout,
) -> Result<()> {
    match command {
        ProfileCommand::Add { email } => commands::add(service, &email, stdout).await,
        ProfileCommand::Search { email, reveal } => {
            commands::search(service, &email, reveal, stdout).await
        }
        ProfileCommand::Shell => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            shell::run(service, stdin, stdout).await
        }
    }
}

/// Provisions keys and opens the store. Any failure here is fatal.
async fn start(settings: &Settings) -> Result<ProfileService> {
    let provider = key_provider(settings)?;
    let mode = if settings.bootstrap {
        ProvisionMode::Bootstrap { aead_algorithm: settings.aead_algorithm()? }
    } else {
        ProvisionMode::Strict
    };

    let keyring = Keyring::provision(provider.as_ref(), mode).context("key provisioning failed")?;

    let store = open_store(&settings.store)
        .await
        .with_context(|| format!("failed to open {} store", settings.store.backend_name()))?;

    info!(
        backend = settings.store.backend_name(),
        timeout_ms = settings.store_timeout_ms,
        "ready"
    );

    Ok(ProfileService::new(keyring, store)
        .with_context(settings.associated_data())
        .with_timeout(settings.store_timeout()))
}

/// Environment keys win over the key directory when any are set.
fn key_provider(settings: &Settings) -> Result<Box<dyn KeyProvider>> {
    let env = EnvKeyProvider::from_env().context("invalid key environment")?;
    if env.is_configured() {
        info!("using keys from environment");
        return Ok(Box::new(env));
    }

    if settings.bootstrap {
        std::fs::create_dir_all(&settings.key_dir).with_context(|| {
            format!("failed to create key directory {}", settings.key_dir.display())
        })?;
    }
    let provider =
        FileKeyProvider::new(&settings.key_dir).context("failed to open key directory")?;
    info!(key_dir = %settings.key_dir.display(), "using key files");
    Ok(Box::new(provider))
}
