//! Task registry: lifecycle control for running probe tasks.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::probe::BoundProbe;
use crate::scheduler::worker;
use crate::store::{StoreWriter, TaskRecord, TaskStatus};

/// Errors raised by registry operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task with this service id is already registered.
    #[error("task [{0}] already exists")]
    DuplicateTask(String),

    /// No task with this service id is registered.
    #[error("task [{0}] not found")]
    UnknownTask(String),

    /// `pause` on a task that is already paused.
    #[error("task [{0}] is already paused")]
    AlreadyPaused(String),

    /// `resume` on a task that is not paused.
    #[error("task [{0}] is not paused")]
    NotPaused(String),
}

/// What a task was registered with; mirrored to the store on transitions.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Catalogue name of the bound probe.
    pub probe: String,
    /// Iteration frequency in seconds.
    pub frequency: u64,
    /// Ordered probe arguments.
    pub configuration: Vec<String>,
}

struct TaskEntry {
    control: watch::Sender<TaskStatus>,
    handle: Option<JoinHandle<()>>,
    spec: TaskSpec,
}

/// Registry of running tasks, one worker per entry.
///
/// All mutation goes through the internal mutex, so two concurrent `add`
/// calls for one service id can never both succeed. The watch channel in
/// each entry is the only state shared with its worker.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskEntry>>,
    store: StoreWriter,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry").finish_non_exhaustive()
    }
}

impl TaskRegistry {
    /// Create an empty registry over the given persistence writer.
    pub fn new(store: StoreWriter) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Register a task and start its worker.
    ///
    /// Returns without waiting for the first iteration.
    pub async fn add(
        &self,
        service_id: &str,
        probe: BoundProbe,
        spec: TaskSpec,
    ) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(service_id) {
            return Err(SchedulerError::DuplicateTask(service_id.to_string()));
        }

        let (control, control_rx) = watch::channel(TaskStatus::Running);
        let handle = tokio::spawn(worker::run(
            service_id.to_string(),
            probe,
            Duration::from_secs(spec.frequency),
            control_rx,
            self.store.clone(),
        ));

        self.mirror(service_id, &spec, TaskStatus::Running);
        tasks.insert(
            service_id.to_string(),
            TaskEntry {
                control,
                handle: Some(handle),
                spec,
            },
        );
        tracing::info!(service_id = %service_id, "Task started");
        Ok(())
    }

    /// Pause a running task.
    ///
    /// The worker observes the pause before its next iteration begins, never
    /// mid-iteration.
    pub async fn pause(&self, service_id: &str) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks
            .get_mut(service_id)
            .ok_or_else(|| SchedulerError::UnknownTask(service_id.to_string()))?;
        if *entry.control.borrow() == TaskStatus::Paused {
            return Err(SchedulerError::AlreadyPaused(service_id.to_string()));
        }

        entry.control.send_replace(TaskStatus::Paused);
        let spec = entry.spec.clone();
        self.mirror(service_id, &spec, TaskStatus::Paused);
        tracing::info!(service_id = %service_id, "Task pause requested");
        Ok(())
    }

    /// Resume a paused task, releasing its blocked worker.
    pub async fn resume(&self, service_id: &str) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks
            .get_mut(service_id)
            .ok_or_else(|| SchedulerError::UnknownTask(service_id.to_string()))?;
        if *entry.control.borrow() != TaskStatus::Paused {
            return Err(SchedulerError::NotPaused(service_id.to_string()));
        }

        entry.control.send_replace(TaskStatus::Running);
        let spec = entry.spec.clone();
        self.mirror(service_id, &spec, TaskStatus::Running);
        tracing::info!(service_id = %service_id, "Task resume requested");
        Ok(())
    }

    /// Stop a task, wait for its worker to exit, and remove it.
    ///
    /// The single `Stopped` transition also releases any pause wait. The
    /// caller blocks for at most one in-flight probe call plus the frequency
    /// sleep; the registry lock is held throughout, which keeps mutations
    /// serialized exactly as a single-threaded dispatcher would.
    pub async fn stop(&self, service_id: &str) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks
            .get_mut(service_id)
            .ok_or_else(|| SchedulerError::UnknownTask(service_id.to_string()))?;

        entry.control.send_replace(TaskStatus::Stopped);
        let handle = entry.handle.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(service_id = %service_id, error = %e, "Worker terminated abnormally");
            }
        }

        if let Some(entry) = tasks.remove(service_id) {
            self.mirror(service_id, &entry.spec, TaskStatus::Stopped);
        }
        tracing::info!(service_id = %service_id, "Task stopped and removed");
        Ok(())
    }

    /// Current lifecycle state of a task, if registered.
    pub async fn status(&self, service_id: &str) -> Option<TaskStatus> {
        let tasks = self.tasks.lock().await;
        tasks.get(service_id).map(|entry| *entry.control.borrow())
    }

    /// Number of registered tasks.
    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Stop every remaining task; used for graceful shutdown.
    pub async fn shutdown(&self) {
        let service_ids: Vec<String> = {
            let tasks = self.tasks.lock().await;
            tasks.keys().cloned().collect()
        };
        for service_id in service_ids {
            if let Err(e) = self.stop(&service_id).await {
                tracing::warn!(service_id = %service_id, error = %e, "Shutdown stop failed");
            }
        }
    }

    fn mirror(&self, service_id: &str, spec: &TaskSpec, status: TaskStatus) {
        let record = TaskRecord {
            task: spec.probe.clone(),
            frequency: spec.frequency,
            configuration: spec.configuration.clone(),
            status,
        };
        if self.store.record_state(service_id, record).is_err() {
            tracing::warn!(service_id = %service_id, "State transition not persisted");
        }
    }
}
