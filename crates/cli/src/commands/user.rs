//! Portal account commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an account (role defaults to the non-privileged role)
//! portal-cli user create -e ana@example.gov.br -n "Ana Souza" -p "s3nh4-f0rte" -r Administrador
//!
//! # Operator recovery: set a new password without the current one
//! portal-cli user reset-password -e ana@example.gov.br -p "n0va-s3nh4"
//! ```
//!
//! Both go through the same account service as the HTTP API, so email
//! normalization, the minimum password length and duplicate detection behave
//! identically.

use agente_cidadao_portal::db::PgUserStore;
use agente_cidadao_portal::services::{AccountService, CreateAccount, PasswordHasher};

use super::{CliError, connect};

/// Create a new portal account.
///
/// # Errors
///
/// Returns `CliError::Account` on invalid input or a duplicate email.
pub async fn create(
    email: &str,
    name: &str,
    password: &str,
    role: Option<String>,
) -> Result<i32, CliError> {
    let users = PgUserStore::new(connect().await?);
    let hasher = PasswordHasher::default();

    let user = AccountService::new(&users, &hasher)
        .create(CreateAccount {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            role,
        })
        .await?;

    tracing::info!(
        "Created user {} ({}) with role {}",
        user.email,
        user.id,
        user.role
    );
    Ok(user.id.as_i32())
}

/// Replace an account's password.
///
/// # Errors
///
/// Returns `CliError::Account` if no account has this email or the password
/// is too short.
pub async fn reset_password(email: &str, password: &str) -> Result<(), CliError> {
    let users = PgUserStore::new(connect().await?);
    let hasher = PasswordHasher::default();

    let user = AccountService::new(&users, &hasher)
        .reset_password(email, password)
        .await?;

    tracing::info!("Password reset for {} ({})", user.email, user.id);
    Ok(())
}
