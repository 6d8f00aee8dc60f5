//! Session service error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::password::PasswordError;

/// Errors from login, current-user and password-change flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was missing or empty.
    #[error("{0}")]
    Incomplete(&'static str),

    /// Unknown email or wrong password. The two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its status is not active.
    #[error("account disabled")]
    AccountDisabled,

    /// Current password did not match during a password change.
    #[error("current password is incorrect")]
    WrongPassword,

    /// New password does not meet the minimum length.
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    /// The session refers to an account that no longer exists.
    #[error("user not found")]
    UserNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}
