//! In-process stores.
//!
//! Used by unit and integration tests in place of Postgres. Both stores can
//! be switched into an "unavailable" mode where every call fails, which is
//! how the gate's failure policies are exercised.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::RwLock;

use agente_cidadao_core::{Email, UserId, UserRole, UserStatus};

use super::{RepositoryError, SettingsStore, UserStore};
use crate::models::{NewUser, Setting, User, UserChanges};

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("memory store switched off".to_owned())
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Default)]
struct UserTable {
    next_id: i32,
    rows: BTreeMap<UserId, User>,
}

impl UserTable {
    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.rows
            .values()
            .any(|u| &u.email == email && Some(u.id) != except)
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    table: RwLock<UserTable>,
    unavailable: AtomicBool,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        self.check()?;
        let table = self.table.read().await;
        let mut users: Vec<User> = table.rows.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| &u.email == email).cloned())
    }

    async fn email_in_use(
        &self,
        email: &Email,
        except: Option<UserId>,
    ) -> Result<bool, RepositoryError> {
        self.check()?;
        Ok(self.table.read().await.email_taken(email, except))
    }

    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        self.check()?;
        let mut table = self.table.write().await;
        if table.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        table.next_id += 1;
        let now = Utc::now();
        let row = User {
            id: UserId::new(table.next_id),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: SecretString::from(user.password_hash.clone()),
            role: user.role.clone(),
            status: user.status,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        let mut table = self.table.write().await;
        if let Some(email) = &changes.email
            && table.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            row.name.clone_from(name);
        }
        if let Some(email) = &changes.email {
            row.email = email.clone();
        }
        if let Some(role) = &changes.role {
            row.role = role.clone();
        }
        if let Some(hash) = &changes.password_hash {
            row.password_hash = SecretString::from(hash.clone());
        }
        row.updated_at = Utc::now().max(row.updated_at);
        Ok(Some(row.clone()))
    }

    async fn set_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|row| {
            row.status = status;
            row.updated_at = Utc::now().max(row.updated_at);
            row.clone()
        }))
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        self.check()?;
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn administrator_exists(&self) -> Result<bool, RepositoryError> {
        self.check()?;
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .any(|u| u.role.as_str() == UserRole::ADMINISTRATOR))
    }
}

// =============================================================================
// Settings
// =============================================================================

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    rows: RwLock<BTreeMap<String, Setting>>,
    unavailable: AtomicBool,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<Setting>, RepositoryError> {
        self.check()?;
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<Setting>, RepositoryError> {
        self.check()?;
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn upsert(&self, key: &str, value: &str) -> Result<Setting, RepositoryError> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let now = Utc::now();
        let updated_at = rows
            .get(key)
            .map_or(now, |previous| now.max(previous.updated_at));
        let setting = Setting {
            key: key.to_owned(),
            value: value.to_owned(),
            updated_at,
        };
        rows.insert(key.to_owned(), setting.clone());
        Ok(setting)
    }
}
