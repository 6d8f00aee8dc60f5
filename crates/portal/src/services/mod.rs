//! Business logic services for the portal.
//!
//! # Services
//!
//! - `accounts` - Admin-only account management with self-protection rules
//! - `auth` - Login, current user and password change
//! - `password` - Argon2id hashing
//! - `settings` - System settings and the restricted-access flag
//!
//! Services borrow their stores as trait objects so the same code runs
//! against Postgres and the in-memory stores.

pub mod accounts;
pub mod auth;
pub mod password;
pub mod settings;

pub use accounts::{AccountError, AccountService, CreateAccount, UpdateAccount};
pub use auth::{AuthError, AuthService};
pub use password::{PasswordError, PasswordHasher};
pub use settings::{SettingsError, SettingsService};
