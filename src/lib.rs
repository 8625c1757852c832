//! Argus - Distributed Network-Diagnostics Monitor
//!
//! This crate provides the core of the Argus monitoring system: clients
//! submit named probe tasks over a TCP control plane, the scheduler runs
//! each task on its own interval with cooperative pause/resume/stop, and the
//! probe engine performs the diagnostics, from raw ICMP echoes up to
//! application-layer checks.
//!
//! # Architecture
//!
//! - **Probe Engine**: raw-packet ICMP ping and traceroute plus pluggable
//!   HTTP/HTTPS, NTP, DNS, and TCP/UDP port checkers, resolved through a
//!   validated probe catalogue
//! - **Scheduler**: one worker per task, tri-state lifecycle shared over a
//!   watch channel, timestamped results with strictly increasing counters
//! - **Control Plane**: a single task multiplexing all management
//!   connections, JSON request/response frames
//! - **Store**: JSON-file persistence behind a non-blocking writer actor
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use argus::{ControlServer, StoreBuilder, TaskRegistry};
//! use argus::probe::checkers;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handles = StoreBuilder::new("data").build()?;
//!     let registry = Arc::new(TaskRegistry::new(handles.writer.clone()));
//!     let catalogue = Arc::new(checkers::standard_catalogue()?);
//!
//!     let server =
//!         ControlServer::bind("127.0.0.1:9999".parse()?, registry, catalogue).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod control;
pub mod probe;
pub mod scheduler;
pub mod store;

pub use config::AppConfig;
pub use control::{ControlClient, ControlServer, Request, Response};
pub use probe::{BoundProbe, ProbeCatalogue, ProbeError};
pub use scheduler::{SchedulerError, TaskRegistry, TaskSpec};
pub use store::{StoreBuilder, StoreHandles, StoreReader, StoreWriter, TaskStatus};
