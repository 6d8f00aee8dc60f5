//! Storage for the portal.
//!
//! # Database: `PostgreSQL`
//!
//! ## Tables
//!
//! - `users` - Portal accounts (normalized unique email, argon2 hash)
//! - `system_settings` - Global key/value settings
//! - `tower_sessions.session` - Session storage (owned by `tower-sessions-sqlx-store`)
//!
//! # Store seams
//!
//! Services and the authorization gate never see a pool. They receive an
//! `Arc<dyn UserStore>` / `Arc<dyn SettingsStore>`, backed by the Postgres
//! implementations in production and by [`memory`] in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/portal/migrations/`. The server applies
//! them at startup; they can also be run explicitly:
//! ```bash
//! cargo run -p agente-cidadao-cli -- migrate
//! ```

pub mod memory;
pub mod settings;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use agente_cidadao_core::{Email, UserId, UserStatus};

use crate::models::{NewUser, Setting, User, UserChanges};

pub use memory::{MemorySettingsStore, MemoryUserStore};
pub use settings::PgSettingsStore;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Translate a unique-index violation into [`RepositoryError::Conflict`].
    pub(crate) fn from_unique_violation(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Credential store: persisted accounts and their password hashes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All accounts, newest first.
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Whether `email` belongs to any account other than `except`.
    async fn email_in_use(
        &self,
        email: &Email,
        except: Option<UserId>,
    ) -> Result<bool, RepositoryError>;

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Apply a partial update. Returns `None` if the account does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email already exists.
    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, RepositoryError>;

    /// Returns `None` if the account does not exist.
    async fn set_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<Option<User>, RepositoryError>;

    /// Returns `false` if the account did not exist.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// Whether at least one account holds the administrator role.
    async fn administrator_exists(&self) -> Result<bool, RepositoryError>;
}

/// Settings store: text key/value pairs.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Setting>, RepositoryError>;

    /// All settings, ordered by key.
    async fn list(&self) -> Result<Vec<Setting>, RepositoryError>;

    /// Insert or update atomically by key, returning the resulting row.
    async fn upsert(&self, key: &str, value: &str) -> Result<Setting, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the portal schema migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
