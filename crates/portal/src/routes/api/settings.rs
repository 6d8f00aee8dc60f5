//! System settings API.
//!
//! Reads of a single key and the restricted-access probe are public; every
//! write and the full listing require an administrator.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Setting;
use crate::routes::extract::{ApiPath, JsonBody};
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(list_settings).put(bulk_update))
        .route(
            "/api/settings/public/restricted-access",
            get(restricted_access),
        )
        .route("/api/settings/{key}", get(get_setting).put(update_setting))
}

#[derive(Debug, Serialize)]
pub struct SettingEntry {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SettingsMapResponse {
    pub settings: BTreeMap<String, SettingEntry>,
}

#[derive(Debug, Serialize)]
pub struct SettingResponse {
    pub setting: Setting,
}

#[derive(Debug, Serialize)]
pub struct SettingUpdatedResponse {
    pub success: bool,
    pub message: &'static str,
    pub setting: Setting,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdatedResponse {
    pub success: bool,
    pub message: &'static str,
    pub settings: Vec<Setting>,
}

#[derive(Debug, Serialize)]
pub struct RestrictedAccessResponse {
    pub restricted_access: bool,
}

/// GET /api/settings
async fn list_settings(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<SettingsMapResponse>, AppError> {
    let settings = state
        .settings_service()
        .all()
        .await?
        .into_iter()
        .map(|s| {
            (
                s.key,
                SettingEntry {
                    value: s.value,
                    updated_at: s.updated_at,
                },
            )
        })
        .collect();

    Ok(Json(SettingsMapResponse { settings }))
}

/// GET /api/settings/{key}
async fn get_setting(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
) -> Result<Json<SettingResponse>, AppError> {
    let setting = state.settings_service().get(&key).await?;
    Ok(Json(SettingResponse { setting }))
}

/// PUT /api/settings/{key}
///
/// Body is `{"value": ...}`. `null` and `""` are stored; only a missing
/// `value` field is rejected.
async fn update_setting(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<SettingUpdatedResponse>, AppError> {
    let setting = state
        .settings_service()
        .upsert(&key, body.get("value"))
        .await?;

    Ok(Json(SettingUpdatedResponse {
        success: true,
        message: "Setting updated",
        setting,
    }))
}

/// PUT /api/settings
///
/// Body is `{"settings": {key: value, ...}}`, applied key by key.
async fn bulk_update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<BulkUpdatedResponse>, AppError> {
    let settings = state
        .settings_service()
        .bulk_upsert(body.get("settings"))
        .await?;

    Ok(Json(BulkUpdatedResponse {
        success: true,
        message: "Settings updated",
        settings,
    }))
}

/// GET /api/settings/public/restricted-access
async fn restricted_access(
    State(state): State<AppState>,
) -> Result<Json<RestrictedAccessResponse>, AppError> {
    let restricted_access = state.settings_service().restricted_access().await?;
    Ok(Json(RestrictedAccessResponse { restricted_access }))
}
