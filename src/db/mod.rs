//! Persistence for user records and rate-limit counters.
//!
//! Both stores sit behind traits so the service can run against Postgres in
//! production and against [`MemoryStore`] in tests.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::Result;

pub use memory::MemoryStore;
pub use models::{PublicUser, User};
pub use operations::DbOperations;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Inserts `user`. Fails with `DatabaseError::Duplicate` when the email is
    /// already taken; the store is the authority on uniqueness.
    async fn create_user(&self, user: &User) -> Result<User>;

    /// Renames the user and touches `updated_at`. `None` if the id is unknown.
    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<Option<User>>;

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Shared, TTL-capable storage for sliding-window hit lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Stored timestamps for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<DateTime<Utc>>>>;

    /// Replaces the hit list for `key`; it expires `ttl` from now.
    async fn set(&self, key: &str, hits: &[DateTime<Utc>], ttl: Duration) -> Result<()>;

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64>;
}
