//! Unified error handling for the portal API.
//!
//! Every error leaves the process as `{"error": <code>, "message": <text>}`.
//! Codes are stable; 5xx messages are generic and the cause is only logged.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AccountError, AuthError, PasswordError, SettingsError};

/// Application-level error type for the portal API.
#[derive(Debug, Error)]
pub enum AppError {
    /// No session, or the session carries no user.
    #[error("log in to access this resource")]
    Unauthenticated,

    /// The session points at an account that no longer exists.
    #[error("your session is invalid")]
    InvalidSession,

    /// Authenticated but not an administrator.
    #[error("you do not have permission to access this resource")]
    Forbidden,

    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("your account is disabled, contact an administrator")]
    AccountDisabled,

    #[error("the current password is incorrect")]
    WrongPassword,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("you cannot delete your own account")]
    SelfDeletion,

    #[error("you cannot deactivate your own account")]
    SelfDeactivation,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the `error` field.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::InvalidSession => "InvalidSession",
            Self::Forbidden => "Forbidden",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::AccountDisabled => "AccountDisabled",
            Self::WrongPassword => "WrongPassword",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::Validation(_) => "ValidationFailed",
            Self::WeakPassword(_) => "WeakPassword",
            Self::InvalidStatus(_) => "InvalidStatus",
            Self::SelfDeletion => "SelfDeletion",
            Self::SelfDeactivation => "SelfDeactivation",
            Self::Database(_) | Self::Internal(_) => "InternalError",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated
            | Self::InvalidSession
            | Self::InvalidCredentials
            | Self::AccountDisabled
            | Self::WrongPassword => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_)
            | Self::WeakPassword(_)
            | Self::InvalidStatus(_)
            | Self::SelfDeletion
            | Self::SelfDeactivation => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Portal request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (
            self.status(),
            Json(json!({ "error": self.code(), "message": message })),
        )
            .into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Incomplete(msg) => Self::Validation(msg.to_string()),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::AccountDisabled => Self::AccountDisabled,
            AuthError::WrongPassword => Self::WrongPassword,
            e @ AuthError::WeakPassword { .. } => Self::WeakPassword(e.to_string()),
            AuthError::UserNotFound => Self::NotFound("user not found".to_string()),
            AuthError::Repository(e) => Self::Database(e),
            AuthError::Password(e) => e.into(),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Incomplete(msg) => Self::Validation(msg.to_string()),
            e @ AccountError::InvalidEmail(_) => Self::Validation(e.to_string()),
            e @ AccountError::WeakPassword { .. } => Self::WeakPassword(e.to_string()),
            e @ AccountError::EmailTaken => Self::Conflict(e.to_string()),
            AccountError::NotFound => Self::NotFound("user not found".to_string()),
            AccountError::SelfDeletion => Self::SelfDeletion,
            AccountError::SelfDeactivation => Self::SelfDeactivation,
            e @ AccountError::InvalidStatus => Self::InvalidStatus(e.to_string()),
            AccountError::Repository(e) => Self::Database(e),
            AccountError::Password(e) => e.into(),
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(e: SettingsError) -> Self {
        match e {
            e @ SettingsError::NotFound => Self::NotFound(e.to_string()),
            e @ (SettingsError::MissingValue | SettingsError::NotAnObject) => {
                Self::Validation(e.to_string())
            }
            SettingsError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {e}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Set the Sentry user context from a portal user.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
