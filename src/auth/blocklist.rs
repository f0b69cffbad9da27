//! Revocation record storage.
//!
//! A store only has to answer "has this `jti` been revoked?" and record new
//! revocations. Inserting an identifier that is already present must succeed
//! and leave the store unchanged.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Failure of the backing store. Never means "not revoked".
#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("revocation store query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RevocationStore: Send + Sync + 'static {
    async fn contains(&self, jti: &str) -> Result<bool, RevocationError>;
    async fn insert(&self, jti: &str) -> Result<(), RevocationError>;
}

/// Process-local blocklist, for tests and single-instance embedding.
#[derive(Debug, Default)]
pub struct InMemoryBlocklist {
    revoked: RwLock<HashSet<String>>,
}

impl InMemoryBlocklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.revoked.read().await.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryBlocklist {
    async fn contains(&self, jti: &str) -> Result<bool, RevocationError> {
        Ok(self.revoked.read().await.contains(jti))
    }

    async fn insert(&self, jti: &str) -> Result<(), RevocationError> {
        self.revoked.write().await.insert(jti.to_owned());
        Ok(())
    }
}
