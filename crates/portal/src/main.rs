//! Agente Cidadão portal server.
//!
//! Serves the portal pages, the session and administration JSON API and the
//! webhook relay.
//!
//! # Startup
//!
//! 1. Load configuration, initialize Sentry and tracing
//! 2. Connect to `PostgreSQL` and run migrations (portal and session store)
//! 3. Ensure an administrator account exists
//! 4. Serve until Ctrl+C or SIGTERM

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agente_cidadao_portal::bootstrap::ensure_admin_exists;
use agente_cidadao_portal::config::PortalConfig;
use agente_cidadao_portal::db::{self, PgSettingsStore, PgUserStore};
use agente_cidadao_portal::middleware::create_session_layer;
use agente_cidadao_portal::routes;
use agente_cidadao_portal::services::PasswordHasher;
use agente_cidadao_portal::state::{AppState, webhook_client};

/// How often expired sessions are purged from the store.
const EXPIRED_SESSION_SWEEP: std::time::Duration = std::time::Duration::from_secs(60);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &PortalConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            // Citizen data passes through the portal
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = PortalConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agente_cidadao_portal=info,tower_http=debug".into());

    // JSON on Railway (or when asked for) for structured log parsing, text locally
    let json_logs = std::env::var("RAILWAY_ENVIRONMENT").is_ok()
        || std::env::var("PORTAL_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    let json_layer =
        json_logs.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    db::migrate(&pool)
        .await
        .expect("Failed to run portal migrations");

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .expect("Failed to run session store migrations");

    tokio::spawn(
        session_store
            .clone()
            .continuously_delete_expired(EXPIRED_SESSION_SWEEP),
    );

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let settings = Arc::new(PgSettingsStore::new(pool));
    let hasher = PasswordHasher::default();

    if let Err(e) = ensure_admin_exists(users.as_ref(), &hasher, &config.bootstrap_admin).await {
        tracing::error!(error = %e, "could not provision the bootstrap administrator");
    }

    let state = AppState::new(
        users,
        settings,
        hasher,
        config.gate,
        config.webhook_forward_url.clone(),
        webhook_client().expect("Failed to build webhook HTTP client"),
    );

    let session_layer =
        create_session_layer(session_store, config.session_hours, config.is_secure());

    let app = routes::app(state, session_layer, &config.static_dir)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(%addr, base_url = %config.base_url, static_dir = %config.static_dir.display(), "portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
