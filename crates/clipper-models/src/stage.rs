//! Job lifecycle stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage in which a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Downloading,
    Planning,
    Rendering,
    Publishing,
}

impl FailedStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedStage::Downloading => "downloading",
            FailedStage::Planning => "planning",
            FailedStage::Rendering => "rendering",
            FailedStage::Publishing => "publishing",
        }
    }
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage of a job along the processing pipeline.
///
/// Transitions are monotonic: a job only moves forward along
/// `Queued -> Downloading -> Planning -> Rendering -> Publishing ->
/// CleaningUp -> Done`, with `Failed` and `Cancelled` reachable from any
/// non-terminal stage. Once a terminal stage is reached the job never
/// leaves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum JobStage {
    /// Waiting for the account worker to become free.
    #[default]
    Queued,
    /// Fetching source media into the workspace.
    Downloading,
    /// Probing duration and computing the clip plan.
    Planning,
    /// Rendering clip `done + 1` of `total`.
    Rendering { done: u32, total: u32 },
    /// Publishing clip `done + 1` of `total`.
    Publishing { done: u32, total: u32 },
    /// Deleting published artifacts from disk.
    CleaningUp,
    /// All clips published and cleaned.
    Done,
    /// Terminal failure. `failed_clips` lists the 1-based clip numbers that
    /// failed to publish (empty for non-publishing failures).
    Failed {
        stage: FailedStage,
        reason: String,
        failed_clips: Vec<u32>,
    },
    /// Cancelled at a safe suspension point.
    Cancelled,
}

impl JobStage {
    /// Short machine-readable name of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Queued => "queued",
            JobStage::Downloading => "downloading",
            JobStage::Planning => "planning",
            JobStage::Rendering { .. } => "rendering",
            JobStage::Publishing { .. } => "publishing",
            JobStage::CleaningUp => "cleaning_up",
            JobStage::Done => "done",
            JobStage::Failed { .. } => "failed",
            JobStage::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStage::Done | JobStage::Failed { .. } | JobStage::Cancelled
        )
    }

    /// Position along the pipeline, used to enforce monotonic transitions.
    /// Terminal stages share the highest rank.
    pub fn rank(&self) -> u8 {
        match self {
            JobStage::Queued => 0,
            JobStage::Downloading => 1,
            JobStage::Planning => 2,
            JobStage::Rendering { .. } => 3,
            JobStage::Publishing { .. } => 4,
            JobStage::CleaningUp => 5,
            JobStage::Done | JobStage::Failed { .. } | JobStage::Cancelled => 6,
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Rendering { done, total } => write!(f, "rendering {}/{}", done + 1, total),
            JobStage::Publishing { done, total } => write!(f, "publishing {}/{}", done + 1, total),
            JobStage::Failed { stage, reason, .. } => write!(f, "failed ({stage}): {reason}"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
