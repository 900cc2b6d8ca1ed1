use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;

use crate::db::models::User;
use crate::db::{CounterStore, UserStore};
use crate::Result;

const USER_COLUMNS: &str =
    "id, name, email, password, active, created_at, updated_at, last_login_at";

#[derive(Clone)]
pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: StdDuration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.as_ref().begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for DbOperations {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        // Single statement in its own transaction: a dropped request either
        // commits the whole row or nothing.
        let mut transaction = self.begin_transaction().await?;

        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password, active, created_at, updated_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .fetch_one(&mut *transaction)
        .await;

        match result {
            Ok(user) => {
                transaction.commit().await?;
                Ok(user)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e.into())
            }
        }
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(name)
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CounterStore for DbOperations {
    async fn get(&self, key: &str) -> Result<Option<Vec<DateTime<Utc>>>> {
        let hits = sqlx::query_scalar::<_, Vec<DateTime<Utc>>>(
            "SELECT hits FROM rate_limit_windows WHERE key = $1 AND expires_at > NOW()",
        )
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(hits)
    }

    async fn set(&self, key: &str, hits: &[DateTime<Utc>], ttl: Duration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_limit_windows (key, hits, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET hits = EXCLUDED.hits, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(hits)
        .bind(Utc::now() + ttl)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut transaction = self.begin_transaction().await?;

        let result = sqlx::query("DELETE FROM rate_limit_windows WHERE expires_at <= NOW()")
            .execute(&mut *transaction)
            .await;

        match result {
            Ok(result) => {
                transaction.commit().await?;
                Ok(result.rows_affected())
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e.into())
            }
        }
    }
}
