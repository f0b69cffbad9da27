use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
use tracing::info;

use crate::{
    auth::{RevocationError, RevocationStore},
    config::DatabaseConfig,
};

#[async_trait]
pub trait Repository: Send + Sync + Clone + 'static {
    async fn health_check(&self) -> bool;
    async fn migrate(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pub pool: Pool<Sqlite>,
}

impl SqliteRepository {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let mut options = SqlitePoolOptions::new();
        if let Some(max) = config.max_connections {
            options = options.max_connections(max);
        }
        if let Some(secs) = config.connection_timeout_seconds {
            options = options.acquire_timeout(Duration::from_secs(secs));
        }
        let pool = options.connect(&config.uri).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for SqliteRepository {
    async fn contains(&self, jti: &str) -> Result<bool, RevocationError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM token_blocklist WHERE jti = ?")
            .bind(jti)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, jti: &str) -> Result<(), RevocationError> {
        sqlx::query(
            "INSERT INTO token_blocklist (jti, revoked_at) VALUES (?, ?) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
