//! Account domain types.
//!
//! [`User`] carries the password hash and is never serialized. Everything
//! that leaves the process goes through [`UserView`].

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use agente_cidadao_core::{Email, UserId, UserRole, UserStatus};

/// A portal account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique, immutable account ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized email address.
    pub email: Email,
    /// PHC-format password hash. Redacted in `Debug`.
    pub password_hash: SecretString,
    pub role: UserRole,
    pub status: UserStatus,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last modified.
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_administrator(&self) -> bool {
        self.role.is_administrator()
    }
}

/// Data for inserting a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
}

/// A partial update. `None` fields are left untouched; `updated_at` is
/// always refreshed.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub role: Option<UserRole>,
    pub password_hash: Option<String>,
}

/// Sanitized account representation (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: UserId::new(1),
            name: "Ana".to_owned(),
            email: Email::parse("ana@x.com").unwrap(),
            password_hash: SecretString::from("$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA"),
            role: UserRole::default(),
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_never_contains_password_hash() {
        let json = serde_json::to_value(UserView::from(sample())).unwrap();
        let object = json.as_object().unwrap();

        assert!(!object.contains_key("password_hash"));
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(object["email"], "ana@x.com");
        assert_eq!(object["status"], "active");
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("argon2"));
    }
}
