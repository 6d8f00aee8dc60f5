//! Authentication extractors for the portal API.
//!
//! `RequireAuth` only checks that the session carries a user. `RequireAdmin`
//! additionally re-reads the role from the credential store on every call, so
//! a demotion takes effect on the very next request.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Read the session identity, if any.
///
/// An unreadable session counts as no session.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Extractor that requires a logged-in user.
///
/// Rejects with 401 `Unauthenticated` without touching any store.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.user_email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AppError::Unauthenticated)?;

        current_user(session)
            .await
            .map(Self)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Extractor that optionally gets the session identity.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Extractor that requires a live administrator.
///
/// - no session → 401 `Unauthenticated`
/// - session user no longer stored → 401 `InvalidSession`
/// - stored role is not the administrator tag → 403 `Forbidden`
/// - store failure → 500
///
/// The session's cached role is never trusted.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(current) = RequireAuth::from_request_parts(parts, state).await?;

        let user = state
            .users()
            .get_by_id(current.user_id)
            .await?
            .ok_or(AppError::InvalidSession)?;

        if !user.is_administrator() {
            tracing::warn!(user_id = %user.id, role = %user.role, "admin access denied");
            return Err(AppError::Forbidden);
        }

        Ok(Self(current))
    }
}
