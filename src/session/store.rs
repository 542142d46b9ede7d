use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::AppError;
use crate::models::User;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// What survives a restart: the bearer token and the profile it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredSession>, AppError>;
    async fn save(&self, session: &StoredSession) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// Session persisted in a local SQLite file, one row per key.
pub struct SqliteSessionStore {
    db: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(db).await
    }

    pub async fn from_pool(db: SqlitePool) -> Result<Self, AppError> {
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(Self { db })
    }

    async fn read_value(&self, key: &str) -> Result<Option<String>, AppError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM session_entries WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.db)
                .await?;
        Ok(value)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, AppError> {
        let token = self.read_value(TOKEN_KEY).await?;
        let user = self.read_value(USER_KEY).await?;

        match (token, user) {
            (Some(token), Some(user)) => {
                let user: User = serde_json::from_str(&user)?;
                Ok(Some(StoredSession { token, user }))
            }
            _ => Ok(None),
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        let user = serde_json::to_string(&session.user)?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db.begin().await?;
        for (key, value) in [(TOKEN_KEY, session.token.as_str()), (USER_KEY, user.as_str())] {
            sqlx::query(
                r#"
                INSERT INTO session_entries (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session_entries WHERE key IN (?1, ?2)")
            .bind(TOKEN_KEY)
            .bind(USER_KEY)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere while holding the lock still leaves a whole value.
    fn slot(&self) -> MutexGuard<'_, Option<StoredSession>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, AppError> {
        Ok(self.slot().clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.slot() = None;
        Ok(())
    }
}
