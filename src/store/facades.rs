//! Read/write facades over the store actor and its files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use crate::store::actor::{self, Command};
use crate::store::types::{ResultRecord, TaskRecord};
use crate::store::StoreError;

/// Non-blocking write facade for the persistence port.
///
/// Every method uses `try_send`: a full or closed channel drops the record
/// with a warning rather than stalling the scheduler or a worker.
#[derive(Clone)]
pub struct StoreWriter {
    tx: SyncSender<Command>,
    dropped_records: Arc<AtomicU64>,
}

impl std::fmt::Debug for StoreWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreWriter").finish_non_exhaustive()
    }
}

impl StoreWriter {
    pub(crate) fn new(tx: SyncSender<Command>) -> Self {
        Self {
            tx,
            dropped_records: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total records dropped due to channel capacity or shutdown.
    pub fn dropped_records(&self) -> u64 {
        self.dropped_records.load(Ordering::Relaxed)
    }

    /// Mirror one task's lifecycle state.
    pub fn record_state(&self, service_id: &str, record: TaskRecord) -> Result<(), StoreError> {
        self.tx
            .try_send(Command::RecordState {
                service_id: service_id.to_string(),
                record,
            })
            .map_err(|_| {
                tracing::warn!(service_id = %service_id, "Channel full, dropping state record");
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                StoreError::ChannelSend
            })
    }

    /// Append one iteration result to the task's log.
    pub fn append_result(&self, service_id: &str, record: ResultRecord) -> Result<(), StoreError> {
        self.tx
            .try_send(Command::AppendResult {
                service_id: service_id.to_string(),
                record,
            })
            .map_err(|_| {
                tracing::warn!(service_id = %service_id, "Channel full, dropping result record");
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                StoreError::ChannelSend
            })
    }
}

/// Read facade over the store directory.
#[derive(Debug, Clone)]
pub struct StoreReader {
    dir: PathBuf,
}

impl StoreReader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load the task registry mirror.
    pub fn tasks(&self) -> Result<BTreeMap<String, TaskRecord>, StoreError> {
        actor::load_tasks(&self.dir)
    }

    /// Load a task's result log; a missing log reads as empty.
    pub fn results(&self, service_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        let file = match File::open(actor::results_path(&self.dir, service_id)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
