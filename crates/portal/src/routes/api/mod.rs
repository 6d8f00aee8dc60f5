//! JSON API routes under `/api`.

pub mod auth;
pub mod settings;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// All JSON API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(settings::router())
}
