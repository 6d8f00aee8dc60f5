//! CLI subcommand implementations.

pub mod migrate;
pub mod user;

use sqlx::PgPool;
use thiserror::Error;

use agente_cidadao_portal::config::{ConfigError, PortalConfig};
use agente_cidadao_portal::db;
use agente_cidadao_portal::services::AccountError;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Connect to the portal database named by `PORTAL_DATABASE_URL`.
async fn connect() -> Result<PgPool, CliError> {
    let database_url = PortalConfig::database_url_from_env()?;

    tracing::info!("Connecting to portal database...");
    Ok(db::create_pool(&database_url).await?)
}
