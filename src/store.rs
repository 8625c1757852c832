//! Persistence Port
//!
//! JSON-file persistence with async write separation:
//! - **Writer**: dedicated thread owning all file I/O, fed by a bounded MPSC
//!   channel; the scheduler and workers never block on it
//! - **Reader**: direct reads over the mirrored files
//!
//! The store mirrors task state in `tasks.json` (rewritten on every recorded
//! transition, reloaded at startup) and appends one JSON line per worker
//! iteration to `<service_id>.jsonl`.
//!
//! # Components
//!
//! - [`StoreWriter`]: non-blocking write facade for state and results
//! - [`StoreReader`]: read facade over the mirrored files
//! - [`StoreBuilder`] / [`StoreHandles`]: initialization and lifecycle

mod actor;
mod builder;
mod error;
mod facades;
mod types;

pub use builder::{StoreBuilder, StoreHandles};
pub use error::StoreError;
pub use facades::{StoreReader, StoreWriter};
pub use types::{ResultRecord, TaskRecord, TaskStatus, TIMESTAMP_FORMAT};
