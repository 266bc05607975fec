//! Rendered clip artifacts and their publish state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::plan::ClipPlan;

/// Publish state of a rendered clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PublishState {
    /// Rendered but not yet published.
    #[default]
    Pending,
    /// Published successfully; the local file is eligible for cleanup.
    Published { post_id: String },
    /// Publish failed; the file is retained on disk for manual retry.
    PublishFailed { reason: String },
}

/// A rendered output file for one [`ClipPlan`].
///
/// Owned exclusively by its job; never shared across jobs or accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipArtifact {
    pub plan: ClipPlan,
    pub path: PathBuf,
    pub publish_state: PublishState,
}

impl ClipArtifact {
    pub fn new(plan: ClipPlan, path: impl Into<PathBuf>) -> Self {
        Self {
            plan,
            path: path.into(),
            publish_state: PublishState::Pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_published(&self) -> bool {
        matches!(self.publish_state, PublishState::Published { .. })
    }

    pub fn is_publish_failed(&self) -> bool {
        matches!(self.publish_state, PublishState::PublishFailed { .. })
    }

    pub fn mark_published(&mut self, post_id: impl Into<String>) {
        self.publish_state = PublishState::Published {
            post_id: post_id.into(),
        };
    }

    pub fn mark_publish_failed(&mut self, reason: impl Into<String>) {
        self.publish_state = PublishState::PublishFailed {
            reason: reason.into(),
        };
    }
}
