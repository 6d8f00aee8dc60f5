//! Session API: login, logout, session probe, current user, password change.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use agente_cidadao_core::{UserId, UserRole};

use crate::error::{AppError, clear_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, set_current_user};
use crate::models::{CurrentUser, UserView};
use crate::routes::extract::JsonBody;
use crate::state::AppState;

/// Build the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/check", get(check))
        .route("/api/auth/password", put(change_password))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<UserRole>,
}

/// POST /api/auth/login
///
/// Cycles the session id before storing the identity.
async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .auth_service()
        .login(&body.email, &body.password)
        .await?;

    session.cycle_id().await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        user: user.into(),
    }))
}

/// POST /api/auth/logout
async fn logout(session: Session) -> Result<Json<SuccessResponse>, AppError> {
    session.flush().await?;
    clear_sentry_user();

    Ok(Json(SuccessResponse {
        success: true,
        message: "Logged out",
    }))
}

/// GET /api/auth/me
///
/// 404 when the session outlived its account.
async fn me(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.auth_service().current_user(current.user_id).await?;

    Ok(Json(UserResponse { user: user.into() }))
}

/// GET /api/auth/check
///
/// Session-presence probe; never touches the credential store.
async fn check(OptionalAuth(current): OptionalAuth) -> Json<CheckResponse> {
    Json(match current {
        Some(current) => CheckResponse {
            authenticated: true,
            user_id: Some(current.user_id),
            user_role: Some(current.user_role),
        },
        None => CheckResponse {
            authenticated: false,
            user_id: None,
            user_role: None,
        },
    })
}

/// PUT /api/auth/password
async fn change_password(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<PasswordChangeRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .auth_service()
        .change_password(current.user_id, &body.current_password, &body.new_password)
        .await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "Password changed",
    }))
}
