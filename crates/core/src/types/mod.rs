//! Core types for the Agente Cidadão portal.
//!
//! This module provides type-safe wrappers for account data.

pub mod email;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::{UserRole, UserStatus};
