//! Shared data models for the ClipperStudio scheduler.
//!
//! Everything that crosses a crate boundary lives here: job identity and
//! lifecycle stages, the pure clip split planner, rendered artifacts with
//! their publish state, per-account settings and the status event stream.

pub mod account;
pub mod clip;
pub mod event;
pub mod job;
pub mod plan;
pub mod stage;

pub use account::{AccountConfig, AccountId};
pub use clip::{ClipArtifact, PublishState};
pub use event::JobEvent;
pub use job::{Job, JobId, JobSummary};
pub use plan::{
    plan_clips, plan_default, ClipPlan, PlanError, DEFAULT_FINAL_MAX_SECS, DEFAULT_FINAL_MIN_SECS,
    DEFAULT_PART_PREFIX, DEFAULT_TARGET_SECS,
};
pub use stage::{FailedStage, JobStage};
