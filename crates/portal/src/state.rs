//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::db::{SettingsStore, UserStore};
use crate::middleware::GatePolicy;
use crate::services::{AccountService, AuthService, PasswordHasher, SettingsService};

/// Timeout for relayed webhook requests.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for webhook relays.
///
/// # Errors
///
/// Returns `reqwest::Error` if the TLS backend cannot be initialised.
pub fn webhook_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Stores are injected as trait objects so the
/// same router runs against Postgres or the in-memory stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    users: Arc<dyn UserStore>,
    settings: Arc<dyn SettingsStore>,
    hasher: PasswordHasher,
    gate: GatePolicy,
    webhook_forward_url: Option<Url>,
    http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        settings: Arc<dyn SettingsStore>,
        hasher: PasswordHasher,
        gate: GatePolicy,
        webhook_forward_url: Option<Url>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                users,
                settings,
                hasher,
                gate,
                webhook_forward_url,
                http,
            }),
        }
    }

    /// Get a reference to the credential store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Get a reference to the settings store.
    #[must_use]
    pub fn settings(&self) -> &dyn SettingsStore {
        self.inner.settings.as_ref()
    }

    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.inner.hasher
    }

    /// Store-failure policy for the page gate.
    #[must_use]
    pub fn gate(&self) -> GatePolicy {
        self.inner.gate
    }

    #[must_use]
    pub fn webhook_forward_url(&self) -> Option<&Url> {
        self.inner.webhook_forward_url.as_ref()
    }

    /// HTTP client for the webhook relay.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    #[must_use]
    pub fn auth_service(&self) -> AuthService<'_> {
        AuthService::new(self.users(), self.hasher())
    }

    #[must_use]
    pub fn account_service(&self) -> AccountService<'_> {
        AccountService::new(self.users(), self.hasher())
    }

    #[must_use]
    pub fn settings_service(&self) -> SettingsService<'_> {
        SettingsService::new(self.settings())
    }
}
