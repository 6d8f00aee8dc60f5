//! Portal configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PORTAL_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `PORTAL_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` / `PORTAL_PORT` - Listen port (default: 3000)
//! - `PORTAL_BASE_URL` - Public URL (default: `https://$RAILWAY_PUBLIC_DOMAIN`
//!   when deployed, otherwise `http://localhost:<port>`)
//! - `PORTAL_STATIC_DIR` - Directory holding the HTML pages (default: frontend/current)
//! - `PORTAL_SESSION_HOURS` - Session inactivity expiry (default: 24)
//! - `WEBHOOK_FORWARD_URL` - Automation endpoint that receives `/webhook/:id` posts
//! - `PORTAL_RESTRICTED_ACCESS_ON_ERROR` - `fail-open` (default) or `fail-closed`
//! - `PORTAL_LOAD_USER_ON_ERROR` - `fail-open` (default) or `fail-closed`
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Bootstrap administrator
//! - `PORTAL_ADMIN_EMAIL` (default: admin@agentecidadao.gov.br)
//! - `PORTAL_ADMIN_NAME` (default: Admin Sistema)
//! - `PORTAL_ADMIN_PASSWORD` (default: admin123, logged as a warning)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::middleware::{GatePolicy, OnStoreError};

const DEFAULT_PORT: &str = "3000";
const DEFAULT_STATIC_DIR: &str = "frontend/current";
const DEFAULT_SESSION_HOURS: &str = "24";
const DEFAULT_ADMIN_EMAIL: &str = "admin@agentecidadao.gov.br";
const DEFAULT_ADMIN_NAME: &str = "Admin Sistema";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "admin123",
    "changeme",
    "password",
    "senha",
    "123456",
    "qwerty",
    "secret",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Portal application configuration.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; `https://` turns on the `Secure` cookie flag
    pub base_url: String,
    /// Directory the HTML pages are served from
    pub static_dir: PathBuf,
    /// Session inactivity expiry, in hours
    pub session_hours: i64,
    /// Where `/webhook/:id` posts are relayed (echoed locally when unset)
    pub webhook_forward_url: Option<Url>,
    /// Store-failure policy for the page gate
    pub gate: GatePolicy,
    /// Administrator created when none exists
    pub bootstrap_admin: BootstrapAdmin,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Bootstrap administrator account.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl BootstrapAdmin {
    fn from_vars(vars: &Vars<'_>) -> Self {
        Self {
            email: vars.get_or_default("PORTAL_ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            name: vars.get_or_default("PORTAL_ADMIN_NAME", DEFAULT_ADMIN_NAME),
            password: SecretString::from(
                vars.get_or_default("PORTAL_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            ),
        }
    }

    /// Check the password against well-known placeholders and an entropy floor.
    ///
    /// A weak password is not fatal; the caller decides how loudly to warn.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InsecureSecret` describing the weakness.
    pub fn password_strength(&self) -> Result<(), ConfigError> {
        validate_secret_strength(self.password.expose_secret(), "PORTAL_ADMIN_PASSWORD")
    }

    /// Whether the built-in default password is in use.
    #[must_use]
    pub fn uses_default_password(&self) -> bool {
        self.password.expose_secret() == DEFAULT_ADMIN_PASSWORD
    }
}

impl PortalConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(&Vars::new(&|key| std::env::var(key).ok()))
    }

    /// Load the database URL alone (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no database URL is set.
    pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
        let _ = dotenvy::dotenv();
        Vars::new(&|key| std::env::var(key).ok()).database_url("PORTAL_DATABASE_URL")
    }

    fn from_vars(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        let database_url = vars.database_url("PORTAL_DATABASE_URL")?;
        let host = vars
            .get_or_default("PORTAL_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORTAL_HOST".to_string(), e.to_string()))?;
        let port = vars
            .get("PORT")
            .or_else(|| vars.get("PORTAL_PORT"))
            .unwrap_or_else(|| DEFAULT_PORT.to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = vars
            .get("PORTAL_BASE_URL")
            .or_else(|| {
                vars.get("RAILWAY_PUBLIC_DOMAIN")
                    .map(|domain| format!("https://{domain}"))
            })
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let static_dir = PathBuf::from(vars.get_or_default("PORTAL_STATIC_DIR", DEFAULT_STATIC_DIR));
        let session_hours = vars
            .get_or_default("PORTAL_SESSION_HOURS", DEFAULT_SESSION_HOURS)
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "PORTAL_SESSION_HOURS".to_string(),
                    "must be a positive number of hours".to_string(),
                )
            })?;
        let webhook_forward_url = vars
            .get("WEBHOOK_FORWARD_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("WEBHOOK_FORWARD_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;
        let gate = GatePolicy {
            restricted_access: vars.policy("PORTAL_RESTRICTED_ACCESS_ON_ERROR")?,
            load_user: vars.policy("PORTAL_LOAD_USER_ON_ERROR")?,
        };
        let bootstrap_admin = BootstrapAdmin::from_vars(vars);
        let sentry_dsn = vars.get("SENTRY_DSN");
        let sentry_environment = vars.get("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = vars
            .get("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = vars
            .get("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            static_dir,
            session_hours,
            webhook_forward_url,
            gate,
            bootstrap_admin,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the portal is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source. Production reads the process environment.
struct Vars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Vars<'a> {
    fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    /// Get an optional variable. Empty values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL` (set by the hosting platform).
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.get(primary_key)
            .or_else(|| self.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    fn policy(&self, key: &str) -> Result<OnStoreError, ConfigError> {
        self.get(key).map_or(Ok(OnStoreError::FailOpen), |raw| {
            raw.parse()
                .map_err(|e: String| ConfigError::InvalidEnvVar(key.to_string(), e))
        })
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Check that a secret is not a well-known password and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("contains a well-known password ('{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
