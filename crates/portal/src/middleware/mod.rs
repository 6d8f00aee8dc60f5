//! HTTP middleware for the portal.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. CORS (permissive)
//! 4. Session layer (tower-sessions)
//! 5. Page gate on HTML routes: `check_restricted_access`, then `load_user`
//! 6. Static directory fallback: `check_restricted_static`
//!
//! API routes authorize through the `RequireAuth` / `RequireAdmin`
//! extractors instead of layers.

pub mod auth;
pub mod gate;
pub mod session;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, current_user, set_current_user};
pub use gate::{
    GatePolicy, LOGIN_PATH, LoadedUser, OnStoreError, check_restricted_access,
    check_restricted_static, load_user,
};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
