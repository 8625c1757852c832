//! Persistent record types for the store layer.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Timestamp format used for result records (wall clock, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lifecycle state of a monitoring task.
///
/// `Stopped` is terminal: a stopped task leaves the registry, though its
/// service id may be reused by a later task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskStatus {
    Running,
    Paused,
    Stopped,
}

/// Durable mirror of one task's registration, keyed by service id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Bound probe name.
    pub task: String,
    /// Iteration frequency in seconds.
    pub frequency: u64,
    /// Ordered probe arguments.
    pub configuration: Vec<String>,
    /// Last recorded lifecycle state.
    pub status: TaskStatus,
}

/// One timestamped probe outcome appended to a task's result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Wall-clock stamp at second precision.
    pub timestamp: String,
    /// 1-based counter, strictly increasing per service id.
    pub iteration: u64,
    /// Probe-specific result mapping.
    pub result: serde_json::Map<String, serde_json::Value>,
}

impl ResultRecord {
    /// Stamp a result with the current wall-clock time.
    pub fn new(iteration: u64, result: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            iteration,
            result,
        }
    }
}
