//! Writer actor with a dedicated thread and MPSC channel.
//!
//! Single-writer pattern: one thread owns all file I/O under the store
//! directory and processes commands from a bounded channel, so the scheduler
//! and its workers never block on persistence latency.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::store::types::{ResultRecord, TaskRecord};
use crate::store::StoreError;

/// File holding the task registry mirror.
const TASKS_FILE: &str = "tasks.json";

/// Commands sent to the writer actor.
#[derive(Debug)]
pub enum Command {
    /// Upsert one task's state in the registry mirror.
    RecordState {
        service_id: String,
        record: TaskRecord,
    },
    /// Append one result to the task's result log.
    AppendResult {
        service_id: String,
        record: ResultRecord,
    },
    /// Graceful shutdown.
    Shutdown,
}

/// Path of the registry mirror inside `dir`.
pub(crate) fn tasks_path(dir: &Path) -> PathBuf {
    dir.join(TASKS_FILE)
}

/// Path of a task's result log inside `dir`.
///
/// Service ids become file names; path separators are replaced so an id can
/// never escape the store directory.
pub(crate) fn results_path(dir: &Path, service_id: &str) -> PathBuf {
    let safe: String = service_id
        .chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect();
    dir.join(format!("{safe}.jsonl"))
}

/// Read the registry mirror, treating a missing file as empty.
pub(crate) fn load_tasks(dir: &Path) -> Result<BTreeMap<String, TaskRecord>, StoreError> {
    match File::open(tasks_path(dir)) {
        Ok(file) => Ok(serde_json::from_reader(file)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// JSON-file writer actor.
///
/// State transitions rewrite the registry mirror; results append one JSON
/// line per iteration to the task's log.
pub struct StoreActor {
    dir: PathBuf,
    rx: Receiver<Command>,
    tasks: BTreeMap<String, TaskRecord>,
}

impl StoreActor {
    /// Spawn the writer actor thread.
    ///
    /// Creates the store directory if needed and loads any existing registry
    /// mirror, so task state survives restarts.
    pub fn spawn(
        dir: &Path,
        channel_capacity: usize,
    ) -> Result<(JoinHandle<()>, SyncSender<Command>), StoreError> {
        std::fs::create_dir_all(dir)?;
        let tasks = load_tasks(dir)?;

        let (tx, rx) = mpsc::sync_channel(channel_capacity);
        let mut actor = StoreActor {
            dir: dir.to_path_buf(),
            rx,
            tasks,
        };
        let handle = thread::spawn(move || actor.run());
        Ok((handle, tx))
    }

    fn run(&mut self) {
        tracing::info!(dir = %self.dir.display(), "StoreActor started");

        loop {
            match self.rx.recv() {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!("Channel disconnected, shutting down");
                    break;
                }
            }
        }

        tracing::info!("StoreActor stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::RecordState { service_id, record } => {
                self.tasks.insert(service_id, record);
                if let Err(e) = self.write_tasks() {
                    tracing::error!(error = %e, "Registry mirror write failed");
                }
            }
            Command::AppendResult { service_id, record } => {
                if let Err(e) = self.append_result(&service_id, &record) {
                    tracing::error!(service_id = %service_id, error = %e, "Result append failed");
                }
            }
            Command::Shutdown => {
                tracing::info!("StoreActor shutting down");
                return true;
            }
        }
        false
    }

    fn write_tasks(&self) -> Result<(), StoreError> {
        let file = File::create(tasks_path(&self.dir))?;
        serde_json::to_writer_pretty(file, &self.tasks)?;
        Ok(())
    }

    fn append_result(&self, service_id: &str, record: &ResultRecord) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(results_path(&self.dir, service_id))?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::TaskStatus;
    use tempfile::tempdir;

    fn record(status: TaskStatus) -> TaskRecord {
        TaskRecord {
            task: "ping".to_string(),
            frequency: 1,
            configuration: vec!["127.0.0.1".to_string(), "1".to_string()],
            status,
        }
    }

    #[test]
    fn test_actor_lifecycle() {
        let dir = tempdir().unwrap();
        let (handle, tx) = StoreActor::spawn(dir.path(), 16).unwrap();
        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_state_transitions_rewrite_mirror() {
        let dir = tempdir().unwrap();
        let (handle, tx) = StoreActor::spawn(dir.path(), 16).unwrap();

        tx.send(Command::RecordState {
            service_id: "svc1".to_string(),
            record: record(TaskStatus::Running),
        })
        .unwrap();
        tx.send(Command::RecordState {
            service_id: "svc1".to_string(),
            record: record(TaskStatus::Paused),
        })
        .unwrap();
        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        let tasks = load_tasks(dir.path()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks["svc1"].status, TaskStatus::Paused);
    }

    #[test]
    fn test_mirror_survives_restart() {
        let dir = tempdir().unwrap();

        let (handle, tx) = StoreActor::spawn(dir.path(), 16).unwrap();
        tx.send(Command::RecordState {
            service_id: "svc1".to_string(),
            record: record(TaskStatus::Running),
        })
        .unwrap();
        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        // A fresh actor over the same directory sees the previous state.
        let (handle, tx) = StoreActor::spawn(dir.path(), 16).unwrap();
        tx.send(Command::RecordState {
            service_id: "svc2".to_string(),
            record: record(TaskStatus::Running),
        })
        .unwrap();
        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        let tasks = load_tasks(dir.path()).unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_results_append_one_line_each() {
        let dir = tempdir().unwrap();
        let (handle, tx) = StoreActor::spawn(dir.path(), 16).unwrap();

        for iteration in 1..=3 {
            tx.send(Command::AppendResult {
                service_id: "svc1".to_string(),
                record: ResultRecord::new(iteration, serde_json::Map::new()),
            })
            .unwrap();
        }
        tx.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        let contents = std::fs::read_to_string(results_path(dir.path(), "svc1")).unwrap();
        let iterations: Vec<u64> = contents
            .lines()
            .map(|line| {
                serde_json::from_str::<ResultRecord>(line)
                    .unwrap()
                    .iteration
            })
            .collect();
        assert_eq!(iterations, vec![1, 2, 3]);
    }

    #[test]
    fn test_results_path_sanitizes_separators() {
        let path = results_path(Path::new("/store"), "../evil");
        assert_eq!(path, Path::new("/store").join(".._evil.jsonl"));
    }
}
