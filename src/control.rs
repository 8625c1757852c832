//! Control-Plane Layer
//!
//! The TCP management surface: JSON request/response frames, the
//! readiness-multiplexed server that dispatches them to the scheduler, and
//! the reconnecting client that issues them.
//!
//! # Architecture
//!
//! - [`protocol`]: wire frames and the [`Action`] vocabulary
//! - [`ControlServer`]: one task multiplexing the listener and all clients
//! - [`ControlClient`]: exponential-backoff connect and retry-once requests

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{ClientError, ControlClient};
pub use protocol::{Action, Request, Response, MAX_FRAME_LEN};
pub use server::ControlServer;
