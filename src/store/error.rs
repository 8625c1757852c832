//! Store-specific error types.

use thiserror::Error;

/// Errors that can occur in the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to hand a record to the writer actor (channel full or closed).
    #[error("failed to send command to store actor")]
    ChannelSend,

    /// Internal error (e.g. actor thread join failure).
    #[error("internal error: {0}")]
    Internal(String),
}
