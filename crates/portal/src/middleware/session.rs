//! Session middleware configuration for the portal.
//!
//! Sets up server-side sessions using tower-sessions. Production uses the
//! `PostgreSQL` store; tests pass `MemoryStore`.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore, cookie::SameSite};

/// Session cookie name for the portal.
pub const SESSION_COOKIE_NAME: &str = "portal_session";

/// Create the session layer over any session store.
///
/// # Arguments
///
/// * `store` - Session store (`PostgresStore` in production)
/// * `expiry_hours` - Inactivity expiry
/// * `secure` - Whether to set the `Secure` cookie flag (HTTPS deployments)
#[must_use]
pub fn create_session_layer<Store>(
    store: Store,
    expiry_hours: i64,
    secure: bool,
) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::hours(expiry_hours),
        ))
        .with_secure(secure)
        // Lax so the login page can be reached from external links
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
