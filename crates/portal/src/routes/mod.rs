//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                - Liveness
//! GET    /health/ready                          - Readiness (settings store)
//!
//! # Pages (restricted-access gate + user hydration)
//! GET    /, /bilingual, /index, /demo, /admin
//! GET    /login                                 - Never gated
//!
//! # Session API
//! POST   /api/auth/login
//! POST   /api/auth/logout
//! GET    /api/auth/me                           - Requires session
//! GET    /api/auth/check
//! PUT    /api/auth/password                     - Requires session
//!
//! # Accounts (administrator only)
//! GET    /api/users
//! POST   /api/users
//! GET    /api/users/{id}
//! PUT    /api/users/{id}
//! DELETE /api/users/{id}
//! PATCH  /api/users/{id}/status
//!
//! # Settings
//! GET    /api/settings                          - Administrator
//! PUT    /api/settings                          - Administrator, bulk
//! GET    /api/settings/public/restricted-access
//! GET    /api/settings/{key}
//! PUT    /api/settings/{key}                    - Administrator
//!
//! # Webhooks
//! POST   /webhook/{id}
//!
//! Anything else is served from the static directory, falling back to the
//! bilingual page with 404. HTML from the directory is gated like the pages.
//! ```

pub mod api;
pub mod extract;
pub mod health;
pub mod pages;
pub mod webhook;

use std::path::Path;
use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    middleware::from_fn_with_state,
};
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::middleware::check_restricted_static;
use crate::state::AppState;

/// Build the complete application router.
///
/// Generic over the session store so tests can run on `MemoryStore`.
pub fn app<Store>(
    state: AppState,
    sessions: SessionManagerLayer<Store>,
    static_dir: &Path,
) -> Router
where
    Store: SessionStore + Clone,
{
    let static_files = from_fn_with_state(state.clone(), check_restricted_static).layer(
        ServeDir::new(static_dir)
            .not_found_service(ServeFile::new(static_dir.join(pages::BILINGUAL_PAGE))),
    );

    Router::new()
        .merge(health::router())
        .merge(pages::router(&state, static_dir))
        .merge(api::router())
        .merge(webhook::router())
        .fallback_service(static_files)
        .layer(sessions)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
