//! Per-account job queue with a strictly serial worker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use clipper_models::{AccountConfig, AccountId, Job, JobId, JobSummary};

use crate::pipeline::{run_job, PipelineContext};

/// The job currently being processed by the worker.
struct ActiveJob {
    summary: Arc<Mutex<JobSummary>>,
    cancel: CancellationToken,
}

/// Queue state shared between the worker task and the supervisor.
struct AccountState {
    config: AccountConfig,
    pending: VecDeque<Job>,
    active: Option<ActiveJob>,
    history: Vec<JobSummary>,
}

/// One account's ordered job queue and its worker task.
///
/// At most one job per account is in a non-pending, non-terminal stage at
/// any time: the worker pops the head job, drives it to a terminal stage
/// and only then picks up the next one.
pub(crate) struct AccountQueue {
    account_id: AccountId,
    state: Arc<Mutex<AccountState>>,
    notify: Arc<Notify>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl AccountQueue {
    /// Spawn the worker task for `account_id`.
    pub(crate) fn spawn(
        account_id: AccountId,
        config: AccountConfig,
        ctx: Arc<PipelineContext>,
    ) -> Self {
        let state = Arc::new(Mutex::new(AccountState {
            config,
            pending: VecDeque::new(),
            active: None,
            history: Vec::new(),
        }));
        let notify = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(worker_loop(
            account_id.clone(),
            Arc::clone(&state),
            Arc::clone(&notify),
            shutdown.clone(),
            ctx,
        ));

        Self {
            account_id,
            state,
            notify,
            shutdown,
            handle,
        }
    }

    /// Append a job to the pending sequence and wake the worker.
    pub(crate) fn enqueue(&self, job: Job) {
        {
            let mut state = self.state.lock().expect("account state poisoned");
            state.pending.push_back(job);
        }
        self.notify.notify_one();
    }

    /// Cancel a job owned by this queue.
    ///
    /// A pending job is removed without side effects (and without a trace
    /// in history); the in-flight job has its token tripped and stops at
    /// the next safe suspension point. Returns false when the job is not
    /// known to this queue.
    pub(crate) fn cancel(&self, job_id: &JobId) -> bool {
        let mut state = self.state.lock().expect("account state poisoned");
        if let Some(pos) = state.pending.iter().position(|job| &job.id == job_id) {
            state.pending.remove(pos);
            debug!(account_id = %self.account_id, job_id = %job_id, "Removed pending job");
            return true;
        }
        if let Some(active) = &state.active {
            if &active.summary.lock().expect("summary lock poisoned").id == job_id {
                active.cancel.cancel();
                info!(account_id = %self.account_id, job_id = %job_id, "Cancel requested for active job");
                return true;
            }
        }
        false
    }

    /// Ordered status: finished jobs first, then the active one, then the
    /// pending sequence.
    pub(crate) fn list_status(&self) -> Vec<JobSummary> {
        let state = self.state.lock().expect("account state poisoned");
        let mut summaries = state.history.clone();
        if let Some(active) = &state.active {
            summaries.push(active.summary.lock().expect("summary lock poisoned").clone());
        }
        summaries.extend(state.pending.iter().map(Job::summary));
        summaries
    }

    /// Replace the account config. Takes effect for the next job pulled,
    /// never retroactively for the in-flight one.
    pub(crate) fn update_config(&self, config: AccountConfig) {
        self.state.lock().expect("account state poisoned").config = config;
    }

    pub(crate) fn config(&self) -> AccountConfig {
        self.state
            .lock()
            .expect("account state poisoned")
            .config
            .clone()
    }

    /// URLs still waiting to be processed, in order.
    pub(crate) fn pending_urls(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("account state poisoned")
            .pending
            .iter()
            .map(|job| job.url.clone())
            .collect()
    }

    /// Stop the worker: no new jobs are started, the active job (if any)
    /// is cancelled at its next safe point.
    pub(crate) async fn shutdown(self) {
        self.shutdown.cancel();
        {
            let state = self.state.lock().expect("account state poisoned");
            if let Some(active) = &state.active {
                active.cancel.cancel();
            }
        }
        self.notify.notify_one();
        let _ = self.handle.await;
        info!(account_id = %self.account_id, "Account queue stopped");
    }
}

/// Strictly serial worker loop: one job at a time, to a terminal stage.
async fn worker_loop(
    account_id: AccountId,
    state: Arc<Mutex<AccountState>>,
    notify: Arc<Notify>,
    shutdown: CancellationToken,
    ctx: Arc<PipelineContext>,
) {
    info!(account_id = %account_id, "Account worker started");
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        // Pop the head job and mark it active under one lock so a cancel
        // request can always find it in exactly one place.
        let next = {
            let mut st = state.lock().expect("account state poisoned");
            match st.pending.pop_front() {
                Some(job) => {
                    let cancel = CancellationToken::new();
                    let shared = Arc::new(Mutex::new(job.summary()));
                    st.active = Some(ActiveJob {
                        summary: Arc::clone(&shared),
                        cancel: cancel.clone(),
                    });
                    Some((job, st.config.clone(), shared, cancel))
                }
                None => None,
            }
        };

        match next {
            Some((mut job, config, shared, cancel)) => {
                debug!(account_id = %account_id, job_id = %job.id, "Worker picked up job");
                run_job(&ctx, &mut job, &config, &shared, &cancel).await;
                let mut st = state.lock().expect("account state poisoned");
                st.active = None;
                st.history.push(job.summary());
            }
            None => {
                tokio::select! {
                    _ = notify.notified() => {}
                    _ = shutdown.cancelled() => break,
                }
            }
        }
    }
    info!(account_id = %account_id, "Account worker stopped");
}
