//! Control-plane wire frames.
//!
//! Requests and responses are single JSON objects exchanged over TCP.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Hard cap on one read from a control connection.
///
/// This bounds frame handling, it does not guarantee frame boundaries:
/// a request larger than this limit cannot be decoded and the sending
/// connection is closed.
pub const MAX_FRAME_LEN: usize = 1024;

/// Management actions a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    AddTask,
    PauseTask,
    ResumeTask,
    StopTask,
}

/// One management request frame.
///
/// `action` stays a plain string at this layer so an unsupported action can
/// be answered with a structured error instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub action: String,
    pub service_id: String,
    /// Probe name; required for `add_task`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Iteration frequency in seconds; required for `add_task`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
    /// Ordered probe arguments; required for `add_task`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Vec<String>>,
}

impl Request {
    /// Build an `add_task` request.
    pub fn add_task(
        service_id: impl Into<String>,
        task: impl Into<String>,
        frequency: u64,
        configuration: Vec<String>,
    ) -> Self {
        Self {
            action: Action::AddTask.to_string(),
            service_id: service_id.into(),
            task: Some(task.into()),
            frequency: Some(frequency),
            configuration: Some(configuration),
        }
    }

    /// Build a `pause_task` request.
    pub fn pause_task(service_id: impl Into<String>) -> Self {
        Self::lifecycle(Action::PauseTask, service_id)
    }

    /// Build a `resume_task` request.
    pub fn resume_task(service_id: impl Into<String>) -> Self {
        Self::lifecycle(Action::ResumeTask, service_id)
    }

    /// Build a `stop_task` request.
    pub fn stop_task(service_id: impl Into<String>) -> Self {
        Self::lifecycle(Action::StopTask, service_id)
    }

    fn lifecycle(action: Action, service_id: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            service_id: service_id.into(),
            task: None,
            frequency: None,
            configuration: None,
        }
    }
}

/// One acknowledgement frame, echoing the requested action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub action: String,
    pub message: String,
}

impl Response {
    /// Successful acknowledgement for an action on a service id.
    pub fn processed(action: &str, service_id: &str) -> Self {
        Self {
            action: action.to_string(),
            message: format!("Action [{action}] for service ID [{service_id}] processed."),
        }
    }

    /// Structured error description for a failed dispatch.
    pub fn error(action: &str, message: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            message: message.into(),
        }
    }
}
