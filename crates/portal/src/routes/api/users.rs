//! Admin-only account management API.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};

use agente_cidadao_core::UserId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::UserView;
use crate::routes::extract::{ApiPath, JsonBody};
use crate::services::{CreateAccount, UpdateAccount};
use crate::state::AppState;

/// Build the account management router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/{id}/status", patch(set_status))
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: UserView,
}

impl UserResponse {
    fn new(user: impl Into<UserView>) -> Self {
        Self {
            success: true,
            message: None,
            user: user.into(),
        }
    }

    fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

/// GET /api/users
async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, AppError> {
    let users = state.account_service().list().await?;

    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserView::from).collect(),
    }))
}

/// GET /api/users/{id}
async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.account_service().get(id).await?;
    Ok(Json(UserResponse::new(user)))
}

/// POST /api/users
async fn create_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state
        .account_service()
        .create(CreateAccount {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(user).with_message("User created")),
    ))
}

/// PUT /api/users/{id}
async fn update_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    JsonBody(body): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .account_service()
        .update(
            id,
            UpdateAccount {
                name: body.name,
                email: body.email,
                role: body.role,
                password: body.password,
            },
        )
        .await?;

    Ok(Json(UserResponse::new(user).with_message("User updated")))
}

/// DELETE /api/users/{id}
async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<DeletedResponse>, AppError> {
    state.account_service().delete(admin.user_id, id).await?;

    Ok(Json(DeletedResponse {
        success: true,
        message: "User deleted",
    }))
}

/// PATCH /api/users/{id}/status
async fn set_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .account_service()
        .set_status(admin.user_id, id, &body.status)
        .await?;

    Ok(Json(UserResponse::new(user).with_message("Status updated")))
}
