//! Session service.
//!
//! Login, current-user lookup and password change. Establishing or
//! destroying the session itself is the route layer's job; this service only
//! decides whether it should happen.

mod error;

pub use error::AuthError;

use secrecy::ExposeSecret;
use tracing::{info, instrument};

use agente_cidadao_core::{Email, UserId};

use crate::db::UserStore;
use crate::models::{User, UserChanges};
use crate::services::password::{MIN_PASSWORD_LENGTH, PasswordHasher, meets_minimum_length};

/// Authentication service over a credential store.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    hasher: &'a PasswordHasher,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, hasher: &'a PasswordHasher) -> Self {
        Self { users, hasher }
    }

    /// Check an email/password pair.
    ///
    /// The email is normalized before lookup. An unknown email, a malformed
    /// email and a wrong password all yield `InvalidCredentials`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Incomplete` if either field is empty.
    /// Returns `AuthError::InvalidCredentials` if the pair does not match.
    /// Returns `AuthError::AccountDisabled` if the account is inactive.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Incomplete("email and password are required"));
        }

        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.status.is_active() {
            return Err(AuthError::AccountDisabled);
        }

        if !self
            .hasher
            .verify(password, user.password_hash.expose_secret())
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "login succeeded");
        Ok(user)
    }

    /// Re-read the session's account from storage.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account was deleted.
    pub async fn current_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change the session user's password after re-verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Incomplete` if either password is empty.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    /// Returns `AuthError::UserNotFound` if the account was deleted.
    /// Returns `AuthError::WrongPassword` if the current password is wrong.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::Incomplete(
                "current and new passwords are required",
            ));
        }
        if !meets_minimum_length(new_password) {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LENGTH,
            });
        }

        let user = self.current_user(id).await?;
        if !self
            .hasher
            .verify(current_password, user.password_hash.expose_secret())
            .await?
        {
            return Err(AuthError::WrongPassword);
        }

        let changes = UserChanges {
            password_hash: Some(self.hasher.hash(new_password).await?),
            ..UserChanges::default()
        };
        self.users
            .update(id, &changes)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(user_id = %id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agente_cidadao_core::{UserRole, UserStatus};

    use super::*;
    use crate::db::MemoryUserStore;
    use crate::models::NewUser;

    async fn store_with(email: &str, password: &str, status: UserStatus) -> (MemoryUserStore, User) {
        let store = MemoryUserStore::new();
        let hash = PasswordHasher::low_cost().hash(password).await.unwrap();
        let user = store
            .insert(&NewUser {
                name: "Ana".to_owned(),
                email: Email::parse(email).unwrap(),
                password_hash: hash,
                role: UserRole::default(),
                status,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_login_normalizes_email() {
        let (store, user) = store_with("ana@x.com", "secret1", UserStatus::Active).await;
        let hasher = PasswordHasher::low_cost();
        let service = AuthService::new(&store, &hasher);

        let logged_in = service.login("  ANA@X.com ", "secret1").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let (store, _) = store_with("ana@x.com", "secret1", UserStatus::Active).await;
        let hasher = PasswordHasher::low_cost();
        let service = AuthService::new(&store, &hasher);

        let wrong = service.login("ana@x.com", "nope!!").await.unwrap_err();
        let unknown = service.login("bob@x.com", "secret1").await.unwrap_err();
        let malformed = service.login("bob", "secret1").await.unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_login() {
        let (store, _) = store_with("ana@x.com", "secret1", UserStatus::Inactive).await;
        let hasher = PasswordHasher::low_cost();
        let service = AuthService::new(&store, &hasher);

        let err = service.login("ana@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let (store, user) = store_with("ana@x.com", "secret1", UserStatus::Active).await;
        let hasher = PasswordHasher::low_cost();
        let service = AuthService::new(&store, &hasher);

        let err = service
            .change_password(user.id, "wrong!", "newsecret")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongPassword));

        service
            .change_password(user.id, "secret1", "newsecret")
            .await
            .unwrap();
        assert!(service.login("ana@x.com", "newsecret").await.is_ok());
        assert!(service.login("ana@x.com", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_change_password_rejects_short_password_first() {
        let (store, user) = store_with("ana@x.com", "secret1", UserStatus::Active).await;
        let hasher = PasswordHasher::low_cost();
        let service = AuthService::new(&store, &hasher);

        let err = service
            .change_password(user.id, "wrong!", "12345")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword { min: 6 }));
    }

    #[tokio::test]
    async fn test_current_user_detects_deleted_account() {
        let (store, user) = store_with("ana@x.com", "secret1", UserStatus::Active).await;
        store.delete(user.id).await.unwrap();
        let hasher = PasswordHasher::low_cost();
        let service = AuthService::new(&store, &hasher);

        let err = service.current_user(user.id).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }
}
