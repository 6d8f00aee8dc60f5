//! Inbound webhook relay.
//!
//! With a forward URL configured the body is POSTed on to
//! `<forward url>/<id>` and the upstream answer is relayed. Without one the
//! webhook is acknowledged locally and echoed back.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AppError;
use crate::routes::extract::ApiPath;
use crate::state::AppState;

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/{id}", post(receive))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub message: &'static str,
    pub webhook_id: String,
    pub timestamp: String,
    pub received_data: Value,
}

/// POST /webhook/{id}
async fn receive(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    info!(webhook_id = %id, body_len = body.len(), "webhook received");

    match state.webhook_forward_url() {
        Some(base) => forward(&state, base, &id, &headers, body).await,
        None => Ok(Json(acknowledge(id, &body)).into_response()),
    }
}

async fn forward(
    state: &AppState,
    base: &Url,
    id: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let target = forward_target(base, id)?;

    let mut request = state.http().post(target.clone()).body(body);
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        request = request.header(CONTENT_TYPE, content_type);
    }

    let upstream = request.send().await.map_err(|e| {
        warn!(error = %e, %target, "webhook forward failed");
        AppError::Internal(format!("webhook forward failed: {e}"))
    })?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let payload: Value = upstream.json().await.map_err(|e| {
        warn!(error = %e, %target, "webhook upstream returned a non-JSON body");
        AppError::Internal(format!("webhook upstream returned invalid JSON: {e}"))
    })?;

    debug!(%target, %status, "webhook relayed");
    Ok((status, Json(payload)).into_response())
}

/// `<base>/<id>` with the id percent-encoded as a single path segment.
fn forward_target(base: &Url, id: &str) -> Result<Url, AppError> {
    let mut target = base.clone();
    target
        .path_segments_mut()
        .map_err(|()| AppError::Internal(format!("webhook forward URL cannot take a path: {base}")))?
        .pop_if_empty()
        .push(id);
    Ok(target)
}

fn acknowledge(id: String, body: &[u8]) -> WebhookAck {
    let received_data = if body.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
    };

    WebhookAck {
        success: true,
        message: "Webhook received",
        webhook_id: id,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        received_data,
    }
}
