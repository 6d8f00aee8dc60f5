//! System settings service.

use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{RepositoryError, SettingsStore};
use crate::models::{RESTRICTED_ACCESS_KEY, Setting, restricted_access_enabled};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("setting not found")]
    NotFound,

    #[error("a value is required")]
    MissingValue,

    #[error("settings must be sent as an object")]
    NotAnObject,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Text form of a JSON value as stored in `system_settings`.
///
/// Strings are stored verbatim; every other value uses its compact JSON text.
#[must_use]
pub fn coerce_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct SettingsService<'a> {
    settings: &'a dyn SettingsStore,
}

impl<'a> SettingsService<'a> {
    #[must_use]
    pub const fn new(settings: &'a dyn SettingsStore) -> Self {
        Self { settings }
    }

    /// Every setting, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Repository` if the store fails.
    pub async fn all(&self) -> Result<Vec<Setting>, SettingsError> {
        Ok(self.settings.list().await?)
    }

    /// # Errors
    ///
    /// Returns `SettingsError::NotFound` if the key has no row.
    pub async fn get(&self, key: &str) -> Result<Setting, SettingsError> {
        self.settings
            .get(key)
            .await?
            .ok_or(SettingsError::NotFound)
    }

    /// Store one value. Any present value is accepted, including `""`,
    /// `false`, `0` and `null`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingValue` if `value` is absent.
    #[instrument(skip(self, value))]
    pub async fn upsert(&self, key: &str, value: Option<&Value>) -> Result<Setting, SettingsError> {
        let value = value.ok_or(SettingsError::MissingValue)?;
        let setting = self.settings.upsert(key, &coerce_value(value)).await?;
        info!(key, "setting updated");
        Ok(setting)
    }

    /// Store every entry of an object, one independent upsert per key in
    /// payload order. A failure part-way leaves earlier entries applied.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::NotAnObject` unless `payload` is a JSON object.
    #[instrument(skip_all)]
    pub async fn bulk_upsert(&self, payload: Option<&Value>) -> Result<Vec<Setting>, SettingsError> {
        let Some(Value::Object(entries)) = payload else {
            return Err(SettingsError::NotAnObject);
        };

        let mut results = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            results.push(self.settings.upsert(key, &coerce_value(value)).await?);
        }

        info!(count = results.len(), "settings updated");
        Ok(results)
    }

    /// Whether restricted-access mode is on. A missing row means off.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Repository` if the store fails.
    pub async fn restricted_access(&self) -> Result<bool, SettingsError> {
        let setting = self.settings.get(RESTRICTED_ACCESS_KEY).await?;
        Ok(restricted_access_enabled(setting.as_ref()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemorySettingsStore;

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value(&json!("true")), "true");
        assert_eq!(coerce_value(&json!(true)), "true");
        assert_eq!(coerce_value(&json!("")), "");
        assert_eq!(coerce_value(&json!(0)), "0");
        assert_eq!(coerce_value(&json!(1.5)), "1.5");
        assert_eq!(coerce_value(&Value::Null), "null");
        assert_eq!(coerce_value(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_upsert_requires_value_but_accepts_falsy() {
        let store = MemorySettingsStore::new();
        let service = SettingsService::new(&store);

        assert!(matches!(
            service.upsert("k", None).await,
            Err(SettingsError::MissingValue)
        ));

        let setting = service.upsert("k", Some(&json!(""))).await.unwrap();
        assert_eq!(setting.value, "");
        let setting = service.upsert("k", Some(&json!(false))).await.unwrap();
        assert_eq!(setting.value, "false");
    }

    #[tokio::test]
    async fn test_bulk_upsert_in_payload_order() {
        let store = MemorySettingsStore::new();
        let service = SettingsService::new(&store);

        let payload = json!({"zeta": "1", "alpha": 2});
        let results = service.bulk_upsert(Some(&payload)).await.unwrap();

        let keys: Vec<_> = results.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(service.get("alpha").await.unwrap().value, "2");
    }

    #[tokio::test]
    async fn test_bulk_upsert_rejects_non_objects() {
        let store = MemorySettingsStore::new();
        let service = SettingsService::new(&store);

        for payload in [json!(["a"]), json!("a"), json!(1), Value::Null] {
            assert!(matches!(
                service.bulk_upsert(Some(&payload)).await,
                Err(SettingsError::NotAnObject)
            ));
        }
        assert!(matches!(
            service.bulk_upsert(None).await,
            Err(SettingsError::NotAnObject)
        ));
    }

    #[tokio::test]
    async fn test_restricted_access_flag() {
        let store = MemorySettingsStore::new();
        let service = SettingsService::new(&store);
        assert!(!service.restricted_access().await.unwrap());

        service
            .upsert(RESTRICTED_ACCESS_KEY, Some(&json!(true)))
            .await
            .unwrap();
        assert!(service.restricted_access().await.unwrap());

        service
            .upsert(RESTRICTED_ACCESS_KEY, Some(&json!("yes")))
            .await
            .unwrap();
        assert!(!service.restricted_access().await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = MemorySettingsStore::new();
        let service = SettingsService::new(&store);
        assert!(matches!(
            service.get("missing").await,
            Err(SettingsError::NotFound)
        ));
    }
}
