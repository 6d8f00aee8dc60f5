//! Account management service.
//!
//! Admin-only CRUD over the credential store. Callers pass the acting
//! session's user id wherever the self-protection rules apply.

use thiserror::Error;
use tracing::{info, instrument};

use agente_cidadao_core::{Email, EmailError, UserId, UserRole, UserStatus};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User, UserChanges};
use crate::services::password::{
    MIN_PASSWORD_LENGTH, PasswordError, PasswordHasher, meets_minimum_length,
};

/// Errors from account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Incomplete(&'static str),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("a user with this email already exists")]
    EmailTaken,

    #[error("user not found")]
    NotFound,

    #[error("you cannot delete your own account")]
    SelfDeletion,

    #[error("you cannot deactivate your own account")]
    SelfDeactivation,

    #[error("status must be \"active\" or \"inactive\"")]
    InvalidStatus,

    #[error("database error: {0}")]
    Repository(RepositoryError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<RepositoryError> for AccountError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(_) => Self::EmailTaken,
            other => Self::Repository(other),
        }
    }
}

/// Input for creating an account.
#[derive(Clone, Default)]
pub struct CreateAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to [`UserRole::DEFAULT`] when absent or empty.
    pub role: Option<String>,
}

/// Input for a partial account update.
///
/// Blank name, email and role count as absent. Only an empty password counts
/// as absent; any other value goes through the length rule.
#[derive(Clone, Default)]
pub struct UpdateAccount {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_length(password: &str) -> Result<(), AccountError> {
    if meets_minimum_length(password) {
        Ok(())
    } else {
        Err(AccountError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        })
    }
}

/// Account service over a credential store.
pub struct AccountService<'a> {
    users: &'a dyn UserStore,
    hasher: &'a PasswordHasher,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, hasher: &'a PasswordHasher) -> Self {
        Self { users, hasher }
    }

    /// All accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.users.list().await?)
    }

    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account does not exist.
    pub async fn get(&self, id: UserId) -> Result<User, AccountError> {
        self.users.get_by_id(id).await?.ok_or(AccountError::NotFound)
    }

    /// Create an active account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Incomplete` if name, email or password is empty.
    /// Returns `AccountError::WeakPassword` if the password is too short.
    /// Returns `AccountError::InvalidEmail` if the email is malformed.
    /// Returns `AccountError::EmailTaken` if the normalized email exists.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: CreateAccount) -> Result<User, AccountError> {
        let name = input.name.trim();
        if name.is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
            return Err(AccountError::Incomplete(
                "name, email and password are required",
            ));
        }
        check_length(&input.password)?;

        let email = Email::parse(&input.email)?;
        if self.users.email_in_use(&email, None).await? {
            return Err(AccountError::EmailTaken);
        }

        let role = provided(input.role).map_or_else(UserRole::default, UserRole::new);
        let user = self
            .users
            .insert(&NewUser {
                name: name.to_owned(),
                email,
                password_hash: self.hasher.hash(&input.password).await?,
                role,
                status: UserStatus::Active,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account does not exist.
    /// Returns `AccountError::EmailTaken` if another account has the new email.
    /// Returns `AccountError::WeakPassword` if the new password is too short.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: UserId, input: UpdateAccount) -> Result<User, AccountError> {
        if self.users.get_by_id(id).await?.is_none() {
            return Err(AccountError::NotFound);
        }

        let email = match provided(input.email) {
            Some(raw) => {
                let email = Email::parse(&raw)?;
                if self.users.email_in_use(&email, Some(id)).await? {
                    return Err(AccountError::EmailTaken);
                }
                Some(email)
            }
            None => None,
        };

        let password_hash = match input.password.filter(|p| !p.is_empty()) {
            Some(password) => {
                check_length(&password)?;
                Some(self.hasher.hash(&password).await?)
            }
            None => None,
        };

        let changes = UserChanges {
            name: provided(input.name).map(|n| n.trim().to_owned()),
            email,
            role: provided(input.role).map(UserRole::new),
            password_hash,
        };
        let user = self
            .users
            .update(id, &changes)
            .await?
            .ok_or(AccountError::NotFound)?;

        info!(user_id = %id, "user updated");
        Ok(user)
    }

    /// Delete an account other than the actor's own.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::SelfDeletion` if `id` is the actor.
    /// Returns `AccountError::NotFound` if the account does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: UserId, id: UserId) -> Result<(), AccountError> {
        if actor == id {
            return Err(AccountError::SelfDeletion);
        }
        if !self.users.delete(id).await? {
            return Err(AccountError::NotFound);
        }

        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidStatus` unless `status` is `active` or `inactive`.
    /// Returns `AccountError::SelfDeactivation` if the actor deactivates themself.
    /// Returns `AccountError::NotFound` if the account does not exist.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        actor: UserId,
        id: UserId,
        status: &str,
    ) -> Result<User, AccountError> {
        let status: UserStatus = status.parse().map_err(|_| AccountError::InvalidStatus)?;
        if actor == id && !status.is_active() {
            return Err(AccountError::SelfDeactivation);
        }

        let user = self
            .users
            .set_status(id, status)
            .await?
            .ok_or(AccountError::NotFound)?;

        info!(user_id = %id, %status, "user status changed");
        Ok(user)
    }

    /// Operator password reset, without the current password.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::WeakPassword` if the password is too short.
    /// Returns `AccountError::NotFound` if no account has this email.
    #[instrument(skip(self, password))]
    pub async fn reset_password(&self, email: &str, password: &str) -> Result<User, AccountError> {
        check_length(password)?;
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AccountError::NotFound)?;

        let changes = UserChanges {
            password_hash: Some(self.hasher.hash(password).await?),
            ..UserChanges::default()
        };
        self.users
            .update(user.id, &changes)
            .await?
            .ok_or(AccountError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryUserStore;

    fn create(name: &str, email: &str, password: &str) -> CreateAccount {
        CreateAccount {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);

        let ana = accounts
            .create(create("Ana", "Ana@X.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(ana.email.as_str(), "ana@x.com");
        assert_eq!(ana.role.as_str(), UserRole::DEFAULT);
        assert_eq!(ana.status, UserStatus::Active);

        let err = accounts
            .create(create("Ana", "ana@x.com ", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);

        assert!(matches!(
            accounts.create(create("", "a@x.com", "secret1")).await,
            Err(AccountError::Incomplete(_))
        ));
        assert!(matches!(
            accounts.create(create("Ana", "a@x.com", "12345")).await,
            Err(AccountError::WeakPassword { .. })
        ));
        assert!(matches!(
            accounts.create(create("Ana", "not-an-email", "secret1")).await,
            Err(AccountError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_update_email_conflict_excludes_self() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);
        let ana = accounts.create(create("Ana", "ana@x.com", "secret1")).await.unwrap();
        accounts.create(create("Bia", "bia@x.com", "secret1")).await.unwrap();

        let same = accounts
            .update(
                ana.id,
                UpdateAccount {
                    email: Some("ANA@x.com".to_owned()),
                    ..UpdateAccount::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.email.as_str(), "ana@x.com");

        let err = accounts
            .update(
                ana.id,
                UpdateAccount {
                    email: Some("bia@x.com".to_owned()),
                    ..UpdateAccount::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
    }

    #[tokio::test]
    async fn test_update_missing_user_checked_first() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);

        let err = accounts
            .update(
                UserId::new(99),
                UpdateAccount {
                    password: Some("123".to_owned()),
                    ..UpdateAccount::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound));
    }

    #[tokio::test]
    async fn test_update_ignores_empty_fields() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);
        let ana = accounts.create(create("Ana", "ana@x.com", "secret1")).await.unwrap();

        let updated = accounts
            .update(
                ana.id,
                UpdateAccount {
                    name: Some(String::new()),
                    role: Some(UserRole::ADMINISTRATOR.to_owned()),
                    ..UpdateAccount::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ana");
        assert!(updated.is_administrator());
    }

    #[tokio::test]
    async fn test_update_whitespace_password_is_checked_not_skipped() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);
        let ana = accounts.create(create("Ana", "ana@x.com", "secret1")).await.unwrap();

        let err = accounts
            .update(
                ana.id,
                UpdateAccount {
                    password: Some("   ".to_owned()),
                    ..UpdateAccount::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::WeakPassword { .. }));

        let updated = accounts
            .update(
                ana.id,
                UpdateAccount {
                    password: Some("      ".to_owned()),
                    ..UpdateAccount::default()
                },
            )
            .await
            .unwrap();
        assert!(
            hasher
                .verify("      ", secrecy::ExposeSecret::expose_secret(&updated.password_hash))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_self_protection() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);
        let admin = accounts.create(create("Adm", "adm@x.com", "secret1")).await.unwrap();
        accounts.create(create("Other", "o@x.com", "secret1")).await.unwrap();

        assert!(matches!(
            accounts.delete(admin.id, admin.id).await,
            Err(AccountError::SelfDeletion)
        ));
        assert!(matches!(
            accounts.set_status(admin.id, admin.id, "inactive").await,
            Err(AccountError::SelfDeactivation)
        ));
        // Re-activating oneself is harmless.
        assert!(accounts.set_status(admin.id, admin.id, "active").await.is_ok());
    }

    #[tokio::test]
    async fn test_status_validation_and_missing_target() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);
        let actor = UserId::new(1);

        assert!(matches!(
            accounts.set_status(actor, UserId::new(2), "banned").await,
            Err(AccountError::InvalidStatus)
        ));
        assert!(matches!(
            accounts.set_status(actor, UserId::new(2), "inactive").await,
            Err(AccountError::NotFound)
        ));
        assert!(matches!(
            accounts.delete(actor, UserId::new(2)).await,
            Err(AccountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_reset_password() {
        let store = MemoryUserStore::new();
        let hasher = PasswordHasher::low_cost();
        let accounts = AccountService::new(&store, &hasher);
        accounts.create(create("Ana", "ana@x.com", "secret1")).await.unwrap();

        accounts.reset_password("ANA@x.com", "another1").await.unwrap();

        let user = store
            .get_by_email(&Email::parse("ana@x.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(
            hasher
                .verify("another1", secrecy::ExposeSecret::expose_secret(&user.password_hash))
                .await
                .unwrap()
        );
    }
}
