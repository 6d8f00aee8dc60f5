//! Startup provisioning of the first administrator.

use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

use agente_cidadao_core::UserRole;

use crate::config::BootstrapAdmin;
use crate::db::UserStore;
use crate::models::User;
use crate::services::{AccountError, AccountService, CreateAccount, PasswordHasher};

/// Create the bootstrap administrator if no administrator exists yet.
///
/// Returns the created account, or `None` when an administrator was already
/// present. Safe to run on every start.
///
/// # Errors
///
/// Returns `AccountError` if the store cannot be read or the account cannot
/// be created. Callers log this and keep serving.
#[instrument(skip_all, fields(email = %admin.email))]
pub async fn ensure_admin_exists(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    admin: &BootstrapAdmin,
) -> Result<Option<User>, AccountError> {
    if users.administrator_exists().await? {
        info!("administrator account present");
        return Ok(None);
    }

    let user = AccountService::new(users, hasher)
        .create(CreateAccount {
            name: admin.name.clone(),
            email: admin.email.clone(),
            password: admin.password.expose_secret().to_owned(),
            role: Some(UserRole::ADMINISTRATOR.to_owned()),
        })
        .await?;

    info!(user_id = %user.id, "bootstrap administrator created");
    if let Err(e) = admin.password_strength() {
        warn!(error = %e, "bootstrap administrator password is weak");
    }
    if admin.uses_default_password() {
        warn!("bootstrap administrator uses the default password, change it after first login");
    } else {
        warn!("change the bootstrap administrator password after first login");
    }

    Ok(Some(user))
}
