//! The queue supervisor.
//!
//! Owns one [`AccountQueue`](crate::account::AccountQueue) per account,
//! runs them concurrently and routes enqueue/cancel/status requests. One
//! account's persistent failures (e.g. an invalid token) never stall or
//! crash other accounts' workers: failure isolation is per job, and every
//! worker runs on its own task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{info, warn};

use clipper_media::{Collaborators, Workspace};
use clipper_models::{AccountConfig, AccountId, Job, JobEvent, JobId, JobSummary};

use crate::account::AccountQueue;
use crate::error::{QueueError, QueueResult};
use crate::pipeline::PipelineContext;
use crate::store::{PersistedAccount, SchedulerStore};

/// Capacity of the status event channel. Slow subscribers lag, they never
/// block a worker.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns all account queues and the status event stream.
pub struct QueueSupervisor {
    ctx: Arc<PipelineContext>,
    queues: Mutex<HashMap<AccountId, AccountQueue>>,
    store: Arc<dyn SchedulerStore>,
}

impl QueueSupervisor {
    pub fn new(
        collab: Collaborators,
        workspace: Arc<Workspace>,
        store: Arc<dyn SchedulerStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ctx: Arc::new(PipelineContext::new(collab, workspace, events)),
            queues: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Subscribe to the stream of job status transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.ctx.events.subscribe()
    }

    /// Restore account configs and pending URLs persisted by a previous
    /// run. Call once, before accepting requests.
    pub async fn restore(&self) -> QueueResult<()> {
        let accounts = self.store.load().await?;
        for persisted in accounts {
            info!(
                account_id = %persisted.account_id,
                pending = persisted.pending_urls.len(),
                "Restoring account queue"
            );
            let mut queues = self.queues.lock().expect("queue map poisoned");
            let queue = queues
                .entry(persisted.account_id.clone())
                .or_insert_with(|| {
                    AccountQueue::spawn(
                        persisted.account_id.clone(),
                        persisted.config.clone(),
                        Arc::clone(&self.ctx),
                    )
                });
            for url in persisted.pending_urls {
                queue.enqueue(Job::new(persisted.account_id.clone(), url));
            }
        }
        Ok(())
    }

    /// Enqueue one or more source URLs for an account, optionally updating
    /// the account's config in the same call.
    ///
    /// The account's queue is created on first use. Returns the new job
    /// ids in queue order.
    pub async fn enqueue(
        &self,
        account_id: &AccountId,
        urls: &[String],
        config: Option<AccountConfig>,
    ) -> QueueResult<Vec<JobId>> {
        for url in urls {
            if url.trim().is_empty() {
                return Err(QueueError::contract_violation("empty URL"));
            }
        }

        let ids = {
            let mut queues = self.queues.lock().expect("queue map poisoned");
            let queue = queues.entry(account_id.clone()).or_insert_with(|| {
                AccountQueue::spawn(
                    account_id.clone(),
                    config.clone().unwrap_or_default(),
                    Arc::clone(&self.ctx),
                )
            });
            if let Some(config) = config {
                queue.update_config(config);
            }
            let mut ids = Vec::with_capacity(urls.len());
            for url in urls {
                let job = Job::new(account_id.clone(), url.clone());
                ids.push(job.id.clone());
                queue.enqueue(job);
            }
            ids
        };

        self.persist().await;
        Ok(ids)
    }

    /// Cancel a job by id, wherever it lives.
    ///
    /// Pending jobs vanish without side effects; the in-flight job stops
    /// at its next safe suspension point.
    pub async fn cancel(&self, job_id: &JobId) -> QueueResult<()> {
        let found = {
            let queues = self.queues.lock().expect("queue map poisoned");
            queues.values().any(|queue| queue.cancel(job_id))
        };
        if !found {
            return Err(QueueError::UnknownJob(job_id.to_string()));
        }
        self.persist().await;
        Ok(())
    }

    /// Ordered job summaries for one account: finished, then active, then
    /// pending. Unknown accounts have an empty status.
    pub fn list_status(&self, account_id: &AccountId) -> Vec<JobSummary> {
        let queues = self.queues.lock().expect("queue map poisoned");
        queues
            .get(account_id)
            .map(AccountQueue::list_status)
            .unwrap_or_default()
    }

    /// Replace an account's config. Takes effect for the next job pulled
    /// from that account's queue, never for the in-flight one.
    pub async fn update_account_config(
        &self,
        account_id: &AccountId,
        config: AccountConfig,
    ) -> QueueResult<()> {
        {
            let mut queues = self.queues.lock().expect("queue map poisoned");
            let queue = queues.entry(account_id.clone()).or_insert_with(|| {
                AccountQueue::spawn(
                    account_id.clone(),
                    config.clone(),
                    Arc::clone(&self.ctx),
                )
            });
            queue.update_config(config);
        }
        self.persist().await;
        Ok(())
    }

    /// Persist configs and pending URLs, then stop every worker. Active
    /// jobs are cancelled at their next safe point; their URLs are the
    /// operator's re-enqueue decision.
    pub async fn shutdown(&self) {
        self.persist().await;
        let queues = {
            let mut map = self.queues.lock().expect("queue map poisoned");
            std::mem::take(&mut *map)
        };
        for (_, queue) in queues {
            queue.shutdown().await;
        }
        info!("Queue supervisor stopped");
    }

    /// Best-effort persistence after every mutating call.
    async fn persist(&self) {
        let accounts: Vec<PersistedAccount> = {
            let queues = self.queues.lock().expect("queue map poisoned");
            queues
                .iter()
                .map(|(account_id, queue)| PersistedAccount {
                    account_id: account_id.clone(),
                    config: queue.config(),
                    pending_urls: queue.pending_urls(),
                })
                .collect()
        };
        if let Err(e) = self.store.save(&accounts).await {
            warn!("failed to persist scheduler state: {e}");
        }
    }
}
