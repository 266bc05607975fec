//! Status events pushed from queue workers to the control surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::job::JobId;
use crate::stage::JobStage;

/// One job status transition, pushed on the supervisor's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub account_id: AccountId,
    pub job_id: JobId,
    pub stage: JobStage,
    /// Optional human-readable detail (e.g. delay before a publish).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(account_id: AccountId, job_id: JobId, stage: JobStage) -> Self {
        Self {
            account_id,
            job_id,
            stage,
            message: None,
            at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether this event marks the end of a job.
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}
