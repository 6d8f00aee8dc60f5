//! HTML pages served from the static directory.
//!
//! Public pages pass through the restricted-access check and then user
//! hydration. The login page is never gated.

use std::path::{Path, PathBuf};

use axum::{
    Extension, Router,
    extract::Request,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::middleware::{LoadedUser, check_restricted_access, load_user};
use crate::state::AppState;

pub const BILINGUAL_PAGE: &str = "agente-cidadao-bilingual.html";
pub const INDEX_PAGE: &str = "index.html";
pub const DEMO_PAGE: &str = "demo-agente-cidadao.html";
pub const ADMIN_PAGE: &str = "admin-agente-cidadao.html";
pub const LOGIN_PAGE: &str = "login-agente-cidadao.html";

/// Build the page router.
///
/// The gate layers need the state up front, so it is passed in rather than
/// supplied through `with_state`.
pub fn router(state: &AppState, static_dir: &Path) -> Router<AppState> {
    let gated = Router::new()
        .route("/", page(static_dir, BILINGUAL_PAGE))
        .route("/bilingual", page(static_dir, BILINGUAL_PAGE))
        .route("/index", page(static_dir, INDEX_PAGE))
        .route("/demo", page(static_dir, DEMO_PAGE))
        .route("/admin", page(static_dir, ADMIN_PAGE))
        // Added last, so it runs first
        .route_layer(from_fn_with_state(state.clone(), load_user))
        .route_layer(from_fn_with_state(state.clone(), check_restricted_access));

    Router::new()
        .route("/login", page(static_dir, LOGIN_PAGE))
        .merge(gated)
}

fn page(static_dir: &Path, file: &str) -> MethodRouter<AppState> {
    let path = static_dir.join(file);
    get(
        move |loaded: Option<Extension<LoadedUser>>, request: Request| {
            let path = path.clone();
            async move { serve_page(path, loaded, request).await }
        },
    )
}

async fn serve_page(
    path: PathBuf,
    loaded: Option<Extension<LoadedUser>>,
    request: Request,
) -> Response {
    if let Some(Extension(LoadedUser(user))) = &loaded {
        debug!(user_id = %user.id, page = %path.display(), "serving page to signed-in user");
    }

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
