//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! portal-cli migrate
//! ```
//!
//! Applies the portal schema migrations (`crates/portal/migrations/`) and
//! then the session store's own table migration.
//!
//! # Environment Variables
//!
//! - `PORTAL_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use tower_sessions_sqlx_store::PostgresStore;

use agente_cidadao_portal::db;

use super::{CliError, connect};

/// Run portal and session store migrations.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running portal migrations...");
    db::migrate(&pool).await?;

    tracing::info!("Running session store migrations...");
    PostgresStore::new(pool)
        .migrate()
        .await
        .map_err(|e| CliError::SessionStore(e.to_string()))?;

    tracing::info!("Migrations complete!");
    Ok(())
}
