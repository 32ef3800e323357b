use std::fmt;
use std::future::Future;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::batch::types::*;
use crate::observability::workflow_metrics;

/// Runs the same kind of operation against N independent targets, one at a
/// time, without letting a failed task abort the rest.
///
/// Progress is published on a watch channel so any number of observers can
/// follow a running batch. Concurrent `execute` calls on the same executor
/// queue behind each other.
#[derive(Debug)]
pub struct BatchExecutor {
    state: watch::Sender<BatchState>,
    run_lock: Mutex<()>,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears `is_pending` when a run ends, including when the run future is dropped.
struct PendingGuard<'a> {
    state: &'a watch::Sender<BatchState>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.is_pending = false);
    }
}

impl BatchExecutor {
    pub fn new() -> Self {
        let (state, _) = watch::channel(BatchState::default());
        Self {
            state,
            run_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> BatchState {
        *self.state.borrow()
    }

    pub async fn execute<T, E, F, Fut>(
        &self,
        tasks: Vec<F>,
        options: &BatchOptions,
    ) -> BatchReport<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_with(tasks, options, &NoopObserver).await
    }

    pub async fn execute_with<T, E, F, Fut, O>(
        &self,
        tasks: Vec<F>,
        options: &BatchOptions,
        observer: &O,
    ) -> BatchReport<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        O: BatchObserver<T, E> + ?Sized,
    {
        let _run = self.run_lock.lock().await;
        let total = tasks.len();
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", batch.id = %batch_id, batch.total = total);

        async move {
            self.state.send_replace(BatchState {
                progress: BatchProgress { current: 0, total },
                is_pending: true,
            });
            let guard = PendingGuard { state: &self.state };

            let mut report = BatchReport::new(total);
            for (index, task) in tasks.into_iter().enumerate() {
                match task().await {
                    Ok(value) => {
                        debug!(index, "Batch task succeeded");
                        workflow_metrics().record_batch_task(true);
                        observer.on_success(index, &value);
                        report.successes += 1;
                        report.values.push(BatchSuccess { index, value });
                    }
                    Err(error) => {
                        warn!(index, error = %error, "Batch task failed");
                        workflow_metrics().record_batch_task(false);
                        observer.on_failure(index, &error);
                        report.failures.push(BatchFailure { index, error });
                    }
                }

                let progress = BatchProgress {
                    current: index + 1,
                    total,
                };
                self.state.send_modify(|s| s.progress = progress);
                observer.on_progress(progress);

                if index + 1 < total {
                    if let Some(delay) = options.delay {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            drop(guard);

            info!(
                successes = report.successes,
                failures = report.failures.len(),
                "Batch finished"
            );
            report
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        events: StdMutex<Vec<String>>,
    }

    impl BatchObserver<u32, String> for Recorder {
        fn on_success(&self, index: usize, value: &u32) {
            self.events.lock().unwrap().push(format!("ok {index} {value}"));
        }

        fn on_failure(&self, index: usize, error: &String) {
            self.events.lock().unwrap().push(format!("err {index} {error}"));
        }

        fn on_progress(&self, progress: BatchProgress) {
            self.events
                .lock()
                .unwrap()
                .push(format!("progress {}/{}", progress.current, progress.total));
        }
    }

    fn tasks(
        outcomes: Vec<Result<u32, String>>,
    ) -> Vec<impl FnOnce() -> std::future::Ready<Result<u32, String>>> {
        outcomes
            .into_iter()
            .map(|outcome| move || std::future::ready(outcome))
            .collect()
    }

    #[tokio::test]
    async fn test_middle_failure_does_not_abort_batch() {
        let executor = BatchExecutor::new();
        let report = executor
            .execute(
                tasks(vec![Ok(10), Err("supplier blocked".to_string()), Ok(30)]),
                &BatchOptions::default(),
            )
            .await;

        assert_eq!(report.successes, 2);
        assert_eq!(report.failed_indices(), vec![1]);
        assert_eq!(report.failures[0].error, "supplier blocked");
        let values: Vec<_> = report.values.iter().map(|s| (s.index, s.value)).collect();
        assert_eq!(values, vec![(0, 10), (2, 30)]);

        let state = executor.state();
        assert_eq!(state.progress, BatchProgress { current: 3, total: 3 });
        assert!(!state.is_pending);
    }

    #[tokio::test]
    async fn test_callbacks_arrive_in_task_order() {
        let executor = BatchExecutor::new();
        let recorder = Recorder::default();
        executor
            .execute_with(
                tasks(vec![Ok(1), Err("x".to_string())]),
                &BatchOptions::default(),
                &recorder,
            )
            .await;

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["ok 0 1", "progress 1/2", "err 1 x", "progress 2/2"]
        );
    }

    #[tokio::test]
    async fn test_tasks_run_strictly_sequentially() {
        let executor = BatchExecutor::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let jobs: Vec<_> = (0..3)
            .map(|i| {
                let log = Arc::clone(&log);
                move || async move {
                    log.lock().unwrap().push(format!("start {i}"));
                    tokio::task::yield_now().await;
                    log.lock().unwrap().push(format!("end {i}"));
                    Ok::<_, String>(i)
                }
            })
            .collect();

        executor.execute(jobs, &BatchOptions::default()).await;

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_tasks() {
        let executor = BatchExecutor::new();
        let started = Instant::now();
        executor
            .execute(
                tasks(vec![Ok(1), Ok(2), Ok(3)]),
                &BatchOptions::with_delay(Duration::from_millis(100)),
            )
            .await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_task_has_no_delay() {
        let executor = BatchExecutor::new();
        let started = Instant::now();
        executor
            .execute(
                tasks(vec![Ok(1)]),
                &BatchOptions::with_delay(Duration::from_secs(5)),
            )
            .await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_all_failures_still_clear_pending() {
        let executor = BatchExecutor::new();
        let report = executor
            .execute(
                tasks(vec![Err("a".to_string()), Err("b".to_string())]),
                &BatchOptions::default(),
            )
            .await;
        assert_eq!(report.successes, 0);
        assert_eq!(report.failures.len(), 2);
        assert!(!executor.state().is_pending);
    }

    #[test]
    fn test_empty_batch() {
        tokio_test::block_on(async {
            let executor = BatchExecutor::new();
            let report = executor
                .execute(tasks(vec![]), &BatchOptions::default())
                .await;
            assert_eq!(report.total, 0);
            assert_eq!(report.successes, 0);
            assert!(report.all_succeeded());
            assert_eq!(executor.state(), BatchState::default());
        });
    }

    #[tokio::test]
    async fn test_pending_visible_while_running() {
        let executor = BatchExecutor::new();
        let receiver = executor.subscribe();
        let seen = StdMutex::new(Vec::new());
        let jobs: Vec<_> = (0..2)
            .map(|i| {
                let receiver = receiver.clone();
                let seen = &seen;
                move || async move {
                    let state = *receiver.borrow();
                    seen.lock().unwrap().push((state.is_pending, state.progress.current));
                    Ok::<_, String>(i)
                }
            })
            .collect();

        executor.execute(jobs, &BatchOptions::default()).await;

        assert_eq!(seen.into_inner().unwrap(), vec![(true, 0), (true, 1)]);
        assert!(!receiver.borrow().is_pending);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_queued() {
        let executor = BatchExecutor::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let batch = |name: &'static str| {
            let log = Arc::clone(&log);
            (0..2)
                .map(move |i| {
                    let log = Arc::clone(&log);
                    move || async move {
                        log.lock().unwrap().push(format!("{name}{i}"));
                        tokio::task::yield_now().await;
                        Ok::<_, String>(i)
                    }
                })
                .collect::<Vec<_>>()
        };

        let options = BatchOptions::default();
        tokio::join!(
            executor.execute(batch("a"), &options),
            executor.execute(batch("b"), &options)
        );

        let log = log.lock().unwrap().clone();
        assert_eq!(log, vec!["a0", "a1", "b0", "b1"]);
    }
}
