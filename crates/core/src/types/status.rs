//! Account role and status types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Whether an account may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    /// The value stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("invalid user status: {s}")),
        }
    }
}

/// Account role.
///
/// Roles are an open set of string tags. Exactly one tag,
/// [`UserRole::ADMINISTRATOR`], grants access to admin-gated operations;
/// every other value is an ordinary account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRole(String);

impl UserRole {
    /// The tag that grants administrator privilege.
    pub const ADMINISTRATOR: &'static str = "Administrador";

    /// The tag assigned when a role is not specified.
    pub const DEFAULT: &'static str = "Usuário";

    /// Wrap an arbitrary role tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The administrator role.
    #[must_use]
    pub fn administrator() -> Self {
        Self(Self::ADMINISTRATOR.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_administrator(&self) -> bool {
        self.0 == Self::ADMINISTRATOR
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserRole {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}
