//! Multi-account job scheduler and sequential processing pipeline.
//!
//! One worker task per account drives jobs through a strict
//! download -> plan -> render -> publish -> cleanup order, one job at a
//! time, while all accounts run concurrently. The supervisor owns the
//! account queues, routes enqueue/cancel/status requests and aggregates a
//! status event stream for the control surface.

pub mod account;
pub mod delay;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod supervisor;

pub use delay::PublishPacing;
pub use error::{QueueError, QueueResult};
pub use pipeline::PipelineContext;
pub use store::{JsonFileStore, NullStore, PersistedAccount, SchedulerStore};
pub use supervisor::QueueSupervisor;

#[cfg(test)]
pub(crate) mod testutil;
