use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::User;
use crate::db::{CounterStore, UserStore};
use crate::error::DatabaseError;
use crate::Result;

#[derive(Debug)]
struct CounterEntry {
    hits: Vec<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
}

impl CounterEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process implementation of both stores.
///
/// Counters held here are per-process, so with several instances each one
/// enforces its own limit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    counters: Arc<RwLock<HashMap<String, CounterEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Flips the `active` flag, for tests exercising deactivated accounts.
    pub async fn set_active(&self, id: Uuid, active: bool) -> bool {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.active = active;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        // Uniqueness is checked under the write lock, like a table constraint.
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate.into());
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.name = name.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<DateTime<Utc>>>> {
        let counters = self.counters.read().await;
        let now = Utc::now();
        Ok(counters
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.hits.clone()))
    }

    async fn set(&self, key: &str, hits: &[DateTime<Utc>], ttl: Duration) -> Result<()> {
        let entry = CounterEntry {
            hits: hits.to_vec(),
            expires_at: Utc::now() + ttl,
        };
        self.counters.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut counters = self.counters.write().await;
        let now = Utc::now();
        let before = counters.len();
        counters.retain(|_, entry| !entry.is_expired(now));
        Ok((before - counters.len()) as u64)
    }
}
