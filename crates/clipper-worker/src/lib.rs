//! Clipping scheduler daemon.
//!
//! Wires the CLI-backed media collaborators and the JSON state store into
//! a [`QueueSupervisor`](clipper_queue::QueueSupervisor) and runs it until
//! a shutdown signal arrives.

pub mod config;

pub use config::WorkerConfig;
