//! Session-related types for portal authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use agente_cidadao_core::{Email, UserId, UserRole};

use super::user::User;

/// Session-stored identity.
///
/// Written once at login. The role is informational only: admin checks
/// always re-read the role from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: UserId,
    pub user_email: Email,
    pub user_role: UserRole,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            user_email: user.email.clone(),
            user_role: user.role.clone(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
