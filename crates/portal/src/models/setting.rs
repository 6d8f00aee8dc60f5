//! System setting domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The well-known key that gates anonymous access to portal pages.
pub const RESTRICTED_ACCESS_KEY: &str = "restricted_access";

/// A key/value row from `system_settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub key: String,
    /// Stored as text regardless of logical type.
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    /// Interpret the value as a flag. Only the literal `"true"` is true.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.value == "true"
    }
}

/// Evaluate the restricted-access flag from an optional row.
///
/// A missing row means the flag is off.
#[must_use]
pub fn restricted_access_enabled(setting: Option<&Setting>) -> bool {
    setting.is_some_and(Setting::is_true)
}
