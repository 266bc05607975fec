//! Scheduler state persistence.
//!
//! The account configs and the pending URL sequence per account must
//! survive a restart. The format is owned by the store implementation,
//! not the scheduler core; the default is a JSON file written atomically.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use clipper_models::{AccountConfig, AccountId};

use crate::error::{QueueError, QueueResult};

/// Per-account state persisted across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAccount {
    pub account_id: AccountId,
    pub config: AccountConfig,
    /// Pending source URLs in queue order. In-flight jobs are not
    /// persisted; an interrupted job is the operator's re-enqueue call.
    pub pending_urls: Vec<String>,
}

/// Persistence collaborator for the supervisor.
#[async_trait]
pub trait SchedulerStore: Send + Sync {
    async fn load(&self) -> QueueResult<Vec<PersistedAccount>>;
    async fn save(&self, accounts: &[PersistedAccount]) -> QueueResult<()>;
}

/// JSON file store with atomic tmp-file + rename writes.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SchedulerStore for JsonFileStore {
    async fn load(&self) -> QueueResult<Vec<PersistedAccount>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let payload = tokio::fs::read(&self.path).await?;
        let accounts = serde_json::from_slice(&payload)?;
        Ok(accounts)
    }

    async fn save(&self, accounts: &[PersistedAccount]) -> QueueResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(accounts)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| QueueError::store(format!("atomic rename failed: {e}")))?;
        debug!(path = %self.path.display(), "Persisted scheduler state");
        Ok(())
    }
}

/// Store that keeps nothing. Used in tests and embedded setups where the
/// caller owns persistence.
pub struct NullStore;

#[async_trait]
impl SchedulerStore for NullStore {
    async fn load(&self) -> QueueResult<Vec<PersistedAccount>> {
        Ok(Vec::new())
    }

    async fn save(&self, _accounts: &[PersistedAccount]) -> QueueResult<()> {
        Ok(())
    }
}
