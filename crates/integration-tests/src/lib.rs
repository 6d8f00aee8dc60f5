//! Integration test harness for the portal.
//!
//! Drives the complete router in-process with `tower::ServiceExt::oneshot`
//! over in-memory stores and `tower_sessions::MemoryStore`. The session
//! cookie is carried between requests by hand.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p agente-cidadao-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use agente_cidadao_core::{Email, UserRole, UserStatus};
use agente_cidadao_portal::db::{MemorySettingsStore, MemoryUserStore, UserStore};
use agente_cidadao_portal::middleware::{GatePolicy, SESSION_COOKIE_NAME, create_session_layer};
use agente_cidadao_portal::models::{NewUser, User};
use agente_cidadao_portal::routes::{self, pages};
use agente_cidadao_portal::services::PasswordHasher;
use agente_cidadao_portal::state::{AppState, webhook_client};

/// Body marker written into each page of the temporary static directory.
#[must_use]
pub fn page_marker(file: &str) -> String {
    format!("<!-- page:{file} -->")
}

/// Builder for [`TestApp`].
#[derive(Default)]
pub struct TestAppBuilder {
    gate: GatePolicy,
    webhook_forward_url: Option<Url>,
}

impl TestAppBuilder {
    #[must_use]
    pub const fn gate(mut self, gate: GatePolicy) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn webhook_forward_url(mut self, url: Url) -> Self {
        self.webhook_forward_url = Some(url);
        self
    }

    #[must_use]
    pub fn build(self) -> TestApp {
        // Already installed by an earlier test in this process is fine
        let _ = rustls::crypto::ring::default_provider().install_default();

        let static_dir = tempfile::tempdir().expect("create static dir");
        for file in [
            pages::BILINGUAL_PAGE,
            pages::INDEX_PAGE,
            pages::DEMO_PAGE,
            pages::ADMIN_PAGE,
            pages::LOGIN_PAGE,
        ] {
            std::fs::write(
                static_dir.path().join(file),
                format!("<html>{}</html>", page_marker(file)),
            )
            .expect("write page");
        }
        std::fs::write(static_dir.path().join("app.css"), "body {}").expect("write asset");

        let users = Arc::new(MemoryUserStore::new());
        let settings = Arc::new(MemorySettingsStore::new());
        let hasher = PasswordHasher::low_cost();

        let state = AppState::new(
            users.clone(),
            settings.clone(),
            hasher.clone(),
            self.gate,
            self.webhook_forward_url,
            webhook_client().expect("build webhook client"),
        );
        let sessions = create_session_layer(MemoryStore::default(), 24, false);
        let router = routes::app(state, sessions, static_dir.path());

        TestApp {
            router,
            users,
            settings,
            hasher,
            _static_dir: static_dir,
        }
    }
}

/// The portal router over fresh in-memory stores.
pub struct TestApp {
    router: Router,
    pub users: Arc<MemoryUserStore>,
    pub settings: Arc<MemorySettingsStore>,
    pub hasher: PasswordHasher,
    _static_dir: TempDir,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::default()
    }

    /// Insert an account directly into the store.
    pub async fn seed_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
        status: UserStatus,
    ) -> User {
        let password_hash = self.hasher.hash(password).await.expect("hash password");
        self.users
            .insert(&NewUser {
                name: name.to_string(),
                email: Email::parse(email).expect("valid email"),
                password_hash,
                role: UserRole::new(role),
                status,
            })
            .await
            .expect("insert user")
    }

    /// Insert an active administrator.
    pub async fn seed_admin(&self, email: &str, password: &str) -> User {
        self.seed_user(
            "Admin",
            email,
            password,
            UserRole::ADMINISTRATOR,
            UserStatus::Active,
        )
        .await
    }

    /// Send a request, optionally with a JSON body and a session cookie.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("build request")).await
    }

    /// Send a prebuilt request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, cookie).await
    }

    /// Log in and return the session cookie (`name=value`).
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/auth/login",
                Some(serde_json::json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.text());
        response.session_cookie().expect("login sets a session cookie")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The `error` code of a JSON error body.
    #[must_use]
    pub fn error_code(&self) -> String {
        self.json()["error"].as_str().unwrap_or_default().to_string()
    }

    /// `portal_session=<id>` from `Set-Cookie`, if present.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
            .map(str::to_string)
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}
