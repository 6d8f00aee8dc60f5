//! Page gate: restricted-access mode and user-context hydration.
//!
//! Both checks read a store, and what happens when that read fails is a
//! configured [`OnStoreError`] policy rather than an implicit catch.

use std::str::FromStr;

use axum::{
    extract::{Request, State},
    http::header::CONTENT_TYPE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{Span, error, warn};

use crate::error::{AppError, set_sentry_user};
use crate::middleware::auth::current_user;
use crate::models::UserView;
use crate::state::AppState;

/// Where unauthenticated visitors are sent in restricted mode.
pub const LOGIN_PATH: &str = "/login";

/// What a gate check does when its store cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnStoreError {
    /// Skip the check and let the request through.
    #[default]
    FailOpen,
    /// Treat the failure as a denial.
    FailClosed,
}

impl FromStr for OnStoreError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!(
                "expected \"fail-open\" or \"fail-closed\", got \"{other}\""
            )),
        }
    }
}

/// Store-failure policy for each gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatePolicy {
    pub restricted_access: OnStoreError,
    pub load_user: OnStoreError,
}

/// The sanitized account attached to a request by [`load_user`].
#[derive(Debug, Clone)]
pub struct LoadedUser(pub UserView);

/// Redirect anonymous visitors to the login page while restricted-access
/// mode is on.
///
/// Authenticated sessions always pass. With `FailOpen` an unreadable
/// settings store lets the request through; with `FailClosed` it is treated
/// as restricted.
pub async fn check_restricted_access(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if blocks_anonymous(&state, &session).await {
        Redirect::to(LOGIN_PATH).into_response()
    } else {
        next.run(request).await
    }
}

/// Restricted-access check for the static directory.
///
/// Any HTML the directory answers with (a page under its file name, or the
/// not-found page) is withheld from anonymous visitors in restricted mode.
/// Other assets pass so the login page can still load them.
pub async fn check_restricted_static(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if is_html(&response) && blocks_anonymous(&state, &session).await {
        Redirect::to(LOGIN_PATH).into_response()
    } else {
        response
    }
}

async fn blocks_anonymous(state: &AppState, session: &Session) -> bool {
    if current_user(session).await.is_some() {
        return false;
    }

    match state.settings_service().restricted_access().await {
        Ok(restricted) => restricted,
        Err(e) => match state.gate().restricted_access {
            OnStoreError::FailOpen => {
                warn!(error = %e, "restricted-access check skipped, settings store unavailable");
                false
            }
            OnStoreError::FailClosed => {
                error!(error = %e, "restricted-access check failed closed");
                true
            }
        },
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("text/html"))
}

/// Attach the session user's sanitized account to the request.
///
/// Anonymous requests and deleted accounts pass through without a
/// [`LoadedUser`]. A store failure is logged and swallowed under `FailOpen`
/// and answered with 500 under `FailClosed`.
pub async fn load_user(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(current) = current_user(&session).await else {
        return next.run(request).await;
    };

    match state.users().get_by_id(current.user_id).await {
        Ok(Some(user)) => {
            Span::current().record("user_id", user.id.as_i32());
            set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
            request
                .extensions_mut()
                .insert(LoadedUser(UserView::from(user)));
        }
        Ok(None) => {}
        Err(e) => match state.gate().load_user {
            OnStoreError::FailOpen => {
                warn!(error = %e, user_id = %current.user_id, "could not load session user");
            }
            OnStoreError::FailClosed => return AppError::Database(e).into_response(),
        },
    }

    next.run(request).await
}
