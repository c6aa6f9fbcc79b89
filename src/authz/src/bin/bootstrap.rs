//! # Gatehouse Bootstrap
//!
//! Provisions a fresh credential database with an administrator:
//! user `root` in group `admin`, and `admin` allowed every verb on `/`.
//! Safe to run repeatedly; existing state is left as it is.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `GATEHOUSE_DB` - database directory (default: ./data/gatehouse)
//! - `GATEHOUSE_ROOT_PASSWORD` - password for `root`, required when `root` does not exist yet
//! - `RUST_LOG` - log level (default: info)

use anyhow::{bail, Context};
use gatehouse_authz::{PermissionEngine, SledPolicyAdapter, ALL_ACTIONS};
use gatehouse_core::UserName;
use gatehouse_vault::{
    CredentialStore, PasswordAuthenticator, PasswordConfig, StoreConfig, User, UserService,
    VaultError,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ROOT_USER: &str = "root";
const ADMIN_GROUP: &str = "admin";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Gatehouse bootstrap v{}", gatehouse_authz::VERSION);

    let config = match std::env::var("GATEHOUSE_DB") {
        Ok(path) => StoreConfig::at_path(path),
        Err(_) => StoreConfig::default(),
    };
    info!("  Database: {}", config.path.display());

    let store = CredentialStore::open(config).context("opening credential store")?;
    let users = PasswordAuthenticator::new(&store, PasswordConfig::default())
        .context("configuring password hashing")?;

    match users.user(&UserName::from(ROOT_USER)) {
        Ok(_) => info!("User {} already exists", ROOT_USER),
        Err(VaultError::NotFound(_)) => {
            let Ok(password) = std::env::var("GATEHOUSE_ROOT_PASSWORD") else {
                bail!("GATEHOUSE_ROOT_PASSWORD must be set to create {}", ROOT_USER);
            };
            users
                .create(&User::new(ROOT_USER), &password)
                .context("creating root user")?;
        }
        Err(e) => return Err(e).context("reading root user"),
    }

    let adapter = Arc::new(SledPolicyAdapter::new(&store).context("opening policy store")?);
    let engine = PermissionEngine::new(adapter)
        .await
        .context("loading policy")?;

    engine
        .add_subject_to_role(ROOT_USER, ADMIN_GROUP)
        .await
        .context("adding root to admin")?;
    engine
        .add_permission(ADMIN_GROUP, "/", &[ALL_ACTIONS])
        .await
        .context("granting admin access")?;

    store.flush().context("flushing credential store")?;

    info!(
        groups = ?engine.groups().await,
        rules = engine.permissions().await.len(),
        "Bootstrap complete"
    );
    Ok(())
}
