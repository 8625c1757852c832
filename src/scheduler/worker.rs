//! Per-task worker loop.
//!
//! One worker runs per registered task, on its own tokio task. The watch
//! channel carrying [`TaskStatus`] is the only state shared with the
//! registry: `Paused` blocks the loop before its next iteration, `Stopped`
//! ends it.

use std::time::Duration;

use tokio::sync::watch;

use crate::probe::BoundProbe;
use crate::store::{ResultRecord, StoreWriter, TaskStatus};

/// Run a task's iterations until the control channel reads `Stopped`.
pub(crate) async fn run(
    service_id: String,
    probe: BoundProbe,
    frequency: Duration,
    mut control: watch::Receiver<TaskStatus>,
    store: StoreWriter,
) {
    let started = std::time::Instant::now();
    let mut iteration: u64 = 0;

    'main: loop {
        match current(&mut control) {
            TaskStatus::Stopped => break,
            TaskStatus::Paused => {
                tracing::info!(service_id = %service_id, "Task paused");
                loop {
                    if control.changed().await.is_err() {
                        // Registry dropped the sender; treat as a stop.
                        break 'main;
                    }
                    match current(&mut control) {
                        TaskStatus::Stopped => break 'main,
                        TaskStatus::Running => {
                            tracing::info!(service_id = %service_id, "Task resumed");
                            break;
                        }
                        TaskStatus::Paused => {}
                    }
                }
            }
            TaskStatus::Running => {}
        }

        match probe.run().await {
            Ok(result) => {
                iteration += 1;
                if store
                    .append_result(&service_id, ResultRecord::new(iteration, result))
                    .is_err()
                {
                    tracing::warn!(service_id = %service_id, iteration, "Result not persisted");
                }
            }
            Err(e) => {
                // Probe failures never terminate the task.
                tracing::warn!(service_id = %service_id, error = %e, "Probe iteration failed");
            }
        }

        // Plain delay: a stop is observed at the top of the next pass, so
        // cancellation latency is bounded by the configured frequency.
        tokio::time::sleep(frequency).await;
    }

    tracing::info!(
        service_id = %service_id,
        iterations = iteration,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Task stopped"
    );
}

fn current(control: &mut watch::Receiver<TaskStatus>) -> TaskStatus {
    *control.borrow_and_update()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::catalogue::{CatalogueError, ProbeCheck, ResultMap};
    use crate::probe::{ProbeCatalogue, ProbeError};
    use crate::store::StoreBuilder;
    use std::sync::Arc;
    use tokio::time::sleep;

    struct InstantCheck;

    #[async_trait::async_trait]
    impl ProbeCheck for InstantCheck {
        fn name(&self) -> &'static str {
            "instant"
        }

        fn validate(&self, _args: &[String]) -> Result<(), CatalogueError> {
            Ok(())
        }

        async fn check(&self, _args: &[String]) -> Result<ResultMap, ProbeError> {
            let mut map = ResultMap::new();
            map.insert("ok".to_string(), serde_json::json!(true));
            Ok(map)
        }
    }

    fn instant_probe() -> BoundProbe {
        let mut catalogue = ProbeCatalogue::new();
        catalogue.register(Arc::new(InstantCheck));
        catalogue.resolve("instant", &[]).unwrap()
    }

    #[tokio::test]
    async fn test_worker_emits_counted_results() {
        let dir = tempfile::tempdir().unwrap();
        let handles = StoreBuilder::new(dir.path()).build().unwrap();

        let (tx, rx) = watch::channel(TaskStatus::Running);
        let handle = tokio::spawn(run(
            "svc".to_string(),
            instant_probe(),
            Duration::from_millis(20),
            rx,
            handles.writer.clone(),
        ));

        sleep(Duration::from_millis(120)).await;
        tx.send_replace(TaskStatus::Stopped);
        handle.await.unwrap();

        let reader = handles.reader.clone();
        handles.shutdown().unwrap();
        let results = reader.results("svc").unwrap();
        assert!(!results.is_empty());
        let iterations: Vec<u64> = results.iter().map(|r| r.iteration).collect();
        let expected: Vec<u64> = (1..=iterations.len() as u64).collect();
        assert_eq!(iterations, expected, "counter must start at 1 and increase");
    }

    #[tokio::test]
    async fn test_worker_pause_halts_and_resume_continues() {
        let dir = tempfile::tempdir().unwrap();
        let handles = StoreBuilder::new(dir.path()).build().unwrap();
        let reader = handles.reader.clone();

        let (tx, rx) = watch::channel(TaskStatus::Running);
        let handle = tokio::spawn(run(
            "svc".to_string(),
            instant_probe(),
            Duration::from_millis(20),
            rx,
            handles.writer.clone(),
        ));

        sleep(Duration::from_millis(100)).await;
        tx.send_replace(TaskStatus::Paused);
        // Let any in-flight iteration drain before sampling.
        sleep(Duration::from_millis(80)).await;
        let before = reader.results("svc").unwrap().len();
        assert!(before > 0);

        sleep(Duration::from_millis(150)).await;
        let during = reader.results("svc").unwrap().len();
        assert_eq!(before, during, "a paused task must not emit results");

        tx.send_replace(TaskStatus::Running);
        sleep(Duration::from_millis(100)).await;
        let after = reader.results("svc").unwrap();
        assert!(after.len() > before, "a resumed task must emit again");
        assert_eq!(
            after[before].iteration,
            before as u64 + 1,
            "the counter continues rather than resetting"
        );

        tx.send_replace(TaskStatus::Stopped);
        handle.await.unwrap();
        handles.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_worker_stop_while_paused() {
        let dir = tempfile::tempdir().unwrap();
        let handles = StoreBuilder::new(dir.path()).build().unwrap();

        let (tx, rx) = watch::channel(TaskStatus::Paused);
        let handle = tokio::spawn(run(
            "svc".to_string(),
            instant_probe(),
            Duration::from_millis(20),
            rx,
            handles.writer.clone(),
        ));

        sleep(Duration::from_millis(50)).await;
        // The stop transition must release the pause wait on its own.
        tx.send_replace(TaskStatus::Stopped);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker must exit promptly when stopped while paused")
            .unwrap();
        handles.shutdown().unwrap();
    }
}
