//! Job definitions for queue processing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::account::AccountId;
use crate::clip::ClipArtifact;
use crate::plan::ClipPlan;
use crate::stage::{FailedStage, JobStage};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One source video's full pipeline run for one account.
///
/// Mutated only by the owning account queue's worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Owning account
    pub account_id: AccountId,

    /// Source video URL
    pub url: String,

    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,

    /// Current stage
    #[serde(default)]
    pub stage: JobStage,

    /// Planned clip segments (set during Planning)
    #[serde(default)]
    pub plan: Vec<ClipPlan>,

    /// Rendered artifacts (grow during Rendering)
    #[serde(default)]
    pub artifacts: Vec<ClipArtifact>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Create a new queued job.
    pub fn new(account_id: AccountId, url: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            account_id,
            url: url.into(),
            submitted_at: Utc::now(),
            stage: JobStage::Queued,
            plan: Vec::new(),
            artifacts: Vec::new(),
            error: None,
        }
    }

    /// Advance the job to `stage`.
    ///
    /// Transitions never leave a terminal stage and never move backwards
    /// along the pipeline; an out-of-order request is ignored. Failures and
    /// cancellation are always reachable from a non-terminal stage.
    pub fn set_stage(&mut self, stage: JobStage) {
        if self.stage.is_terminal() {
            return;
        }
        if stage.rank() < self.stage.rank() {
            return;
        }
        self.stage = stage;
    }

    /// Move the job to a terminal failure.
    pub fn fail(&mut self, stage: FailedStage, reason: impl Into<String>, failed_clips: Vec<u32>) {
        let reason = reason.into();
        self.error = Some(reason.clone());
        self.set_stage(JobStage::Failed {
            stage,
            reason,
            failed_clips,
        });
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Snapshot for status listings and events.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            account_id: self.account_id.clone(),
            url: self.url.clone(),
            stage: self.stage.clone(),
            submitted_at: self.submitted_at,
            error: self.error.clone(),
        }
    }
}

/// Read-only view of a job for the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub account_id: AccountId,
    pub url: String,
    pub stage: JobStage,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
