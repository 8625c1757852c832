//! Probe Engine Layer
//!
//! Raw-packet diagnostics (ICMP echo and TTL-escalating traceroute) plus the
//! catalogue that maps probe names to runnable, argument-validated probes.
//!
//! # Architecture
//!
//! - [`icmp`]: byte-exact echo frame construction and checksumming
//! - [`ping`] / [`traceroute`]: blocking raw-socket exchanges, one socket per
//!   call, driven under `spawn_blocking` by the catalogue
//! - [`ProbeCatalogue`]: builtin probes plus the [`ProbeCheck`] plugin table
//! - [`checkers`]: the standard application/transport layer checker plugins

pub mod catalogue;
pub mod checkers;
pub mod icmp;
pub mod ping;
pub mod traceroute;

pub use catalogue::{BoundProbe, CatalogueError, ProbeCatalogue, ProbeCheck, ResultMap};
pub use ping::{send_echo, EchoReply};
pub use traceroute::TracerouteHop;

use thiserror::Error;

/// Errors fatal to one probe invocation.
///
/// Timeouts never appear here; they are ordinary [`EchoReply::Timeout`]
/// observations (or `status: false` checker fields).
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Opening the raw socket was denied by the OS.
    #[error("raw socket requires elevated privileges: {0}")]
    Permission(std::io::Error),

    /// The host has no usable IPv4 address.
    #[error("failed to resolve host [{0}] to an IPv4 address")]
    Resolve(String),

    /// Unexpected transport/OS failure during the probe call.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Internal execution failure (e.g. a cancelled blocking task).
    #[error("probe execution failed: {0}")]
    Internal(String),
}
