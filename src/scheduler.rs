//! Task Scheduler Layer
//!
//! Owns the registry of running tasks. Each task gets its own tokio worker
//! task bound to a resolved probe, an iteration frequency, and a watch
//! channel carrying the tri-state lifecycle (`Running | Paused | Stopped`).
//!
//! # Architecture
//!
//! - [`TaskRegistry`]: serialized add/pause/resume/stop over the task map
//! - [`worker`]: the per-task iteration loop emitting timestamped results
//!
//! Cancellation is cooperative: an in-flight probe always completes, and a
//! stopping worker is next observed after its frequency sleep.

pub mod registry;
mod worker;

pub use registry::{SchedulerError, TaskRegistry, TaskSpec};
