//! Task runner
//!
//! Drives one [`Worker`] through a perpetual cycle:
//!
//! ```text
//! IDLE ──sleep──▶ POLLING ──none/error──▶ IDLE
//!                    │
//!                    └──task──▶ EXECUTING ──▶ REPORTING ──▶ IDLE
//! ```
//!
//! Poll, process and update each run inside their own error boundary. A
//! failed poll counts as an empty poll, a failed or panicking worker yields a
//! `FAILED` result that is still reported, and a failed report is logged and
//! dropped. Nothing in the loop ends it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use conductor_client::models::{Task, TaskResult, TaskResultStatus};
use conductor_client::ClientError;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

use crate::client::TaskClient;
use crate::config::RunnerConfig;
use crate::worker::{Worker, WorkerError};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("worker task type must not be empty")]
    EmptyTaskType,
}

/// What a single loop iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Server had no task for this worker
    NoTask,
    /// Poll call failed; treated like an empty poll
    PollFailed,
    /// Task processed and its result accepted by the server
    Reported(TaskResultStatus),
    /// Task processed but the update call failed
    ReportFailed(TaskResultStatus),
}

/// Poll, execute, report loop for one worker
pub struct TaskRunner {
    worker: Arc<dyn Worker>,
    client: Arc<dyn TaskClient>,
    task_type: String,
    worker_id: String,
    domain: Option<String>,
    poll_interval: Duration,
}

impl TaskRunner {
    /// Create a runner; fails if the worker reports an empty task type
    pub fn new(
        worker: Arc<dyn Worker>,
        client: Arc<dyn TaskClient>,
        config: RunnerConfig,
    ) -> Result<Self, RunnerError> {
        let task_type = worker.task_type().trim().to_string();
        if task_type.is_empty() {
            return Err(RunnerError::EmptyTaskType);
        }

        let worker_id = config.worker_id.unwrap_or_else(|| worker.identity());
        let poll_interval = worker.poll_interval().unwrap_or(config.poll_interval);

        Ok(Self {
            worker,
            client,
            task_type,
            worker_id,
            domain: config.domain,
            poll_interval,
        })
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run forever
    pub async fn run(&self) {
        self.log_start();
        loop {
            self.run_once().await;
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    ///
    /// The flag is checked between iterations and during the wait; an
    /// iteration that already polled a task always reports it first.
    pub async fn run_until(&self, mut shutdown: watch::Receiver<bool>) {
        self.log_start();
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            self.poll_and_execute().await;
        }
        info!(task_type = %self.task_type, worker_id = %self.worker_id, "Task runner stopped");
    }

    /// One full iteration: wait, then poll, execute and report
    pub async fn run_once(&self) -> IterationOutcome {
        tokio::time::sleep(self.poll_interval).await;
        self.poll_and_execute().await
    }

    /// One iteration without the leading wait
    #[instrument(skip(self), fields(task_type = %self.task_type, worker_id = %self.worker_id))]
    pub async fn poll_and_execute(&self) -> IterationOutcome {
        let task = match self.poll().await {
            Ok(task) => task,
            Err(outcome) => return outcome,
        };

        let result = self.execute(task).await;
        self.report(result).await
    }

    fn log_start(&self) {
        info!(
            task_type = %self.task_type,
            worker_id = %self.worker_id,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            domain = ?self.domain,
            "Starting task runner"
        );
    }

    async fn poll(&self) -> Result<Task, IterationOutcome> {
        let polled = AssertUnwindSafe(self.client.poll(
            &self.task_type,
            &self.worker_id,
            self.domain.as_deref(),
        ))
        .catch_unwind()
        .await;

        match polled {
            Ok(Ok(Some(task))) => {
                debug!(
                    task_id = %task.task_id,
                    workflow_instance_id = %task.workflow_instance_id,
                    "Polled task"
                );
                Ok(task)
            }
            Ok(Ok(None)) => {
                trace!("No task available");
                Err(IterationOutcome::NoTask)
            }
            Ok(Err(ClientError::Api { status, message })) => {
                warn!(status, error = %message, "Server rejected poll");
                Err(IterationOutcome::PollFailed)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to poll for task");
                Err(IterationOutcome::PollFailed)
            }
            Err(panic) => {
                warn!(error = %panic_message(panic.as_ref()), "Poll panicked");
                Err(IterationOutcome::PollFailed)
            }
        }
    }

    async fn execute(&self, task: Task) -> TaskResult {
        let mut base = TaskResult::new(&task);
        base.worker_id = Some(self.worker_id.clone());

        let worker = Arc::clone(&self.worker);
        let started = Instant::now();
        let processed = tokio::task::spawn_blocking(move || worker.process(&task)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match processed {
            Ok(Ok(mut result)) => {
                // A normal return always completes the task; output, logs and lease are kept
                result.task_id = base.task_id;
                result.workflow_instance_id = base.workflow_instance_id;
                result.worker_id = base.worker_id;
                result.status = TaskResultStatus::Completed;
                result.reason_for_incompletion = None;
                result.callback_after_seconds = 0;
                debug!(
                    task_id = %result.task_id,
                    status = %result.status,
                    elapsed_ms,
                    "Task processed"
                );
                result
            }
            Ok(Err(err)) => {
                warn!(
                    task_id = %base.task_id,
                    terminal = err.terminal,
                    elapsed_ms,
                    error = %err,
                    "Worker failed to process task"
                );
                failed_result(base, err)
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    panic_message(join_err.into_panic().as_ref())
                } else {
                    join_err.to_string()
                };
                warn!(
                    task_id = %base.task_id,
                    elapsed_ms,
                    error = %reason,
                    "Worker panicked while processing task"
                );
                base.with_failure(TaskResultStatus::Failed, reason)
            }
        }
    }

    async fn report(&self, result: TaskResult) -> IterationOutcome {
        let status = result.status;
        let reported = AssertUnwindSafe(self.client.update(&result))
            .catch_unwind()
            .await;

        match reported {
            Ok(Ok(())) => {
                debug!(task_id = %result.task_id, %status, "Reported task result");
                IterationOutcome::Reported(status)
            }
            Ok(Err(e)) => {
                warn!(
                    task_id = %result.task_id,
                    %status,
                    status_code = ?e.status(),
                    error = %e,
                    "Failed to report task result"
                );
                IterationOutcome::ReportFailed(status)
            }
            Err(panic) => {
                warn!(
                    task_id = %result.task_id,
                    %status,
                    error = %panic_message(panic.as_ref()),
                    "Report panicked"
                );
                IterationOutcome::ReportFailed(status)
            }
        }
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("task_type", &self.task_type)
            .field("worker_id", &self.worker_id)
            .field("domain", &self.domain)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

fn failed_result(base: TaskResult, err: WorkerError) -> TaskResult {
    let mut result = base.with_failure(err.status(), err.message);
    if let Some(details) = err.details {
        result.add_output("error", details);
    }
    result
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::FnWorker;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves one fixed task forever and records updates
    struct FixedClient {
        task: Option<Task>,
        updates: Mutex<Vec<TaskResult>>,
    }

    #[async_trait]
    impl TaskClient for FixedClient {
        async fn poll(
            &self,
            _task_type: &str,
            _worker_id: &str,
            _domain: Option<&str>,
        ) -> Result<Option<Task>, ClientError> {
            Ok(self.task.clone())
        }

        async fn update(&self, result: &TaskResult) -> Result<(), ClientError> {
            self.updates.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    fn runner(worker: FnWorker, task: Option<Task>) -> (TaskRunner, Arc<FixedClient>) {
        let client = Arc::new(FixedClient {
            task,
            updates: Mutex::new(Vec::new()),
        });
        let config = RunnerConfig::new()
            .with_poll_interval(Duration::from_millis(1))
            .with_worker_id("test-worker");
        let runner = TaskRunner::new(Arc::new(worker), client.clone(), config).unwrap();
        (runner, client)
    }

    #[test]
    fn test_empty_task_type_rejected() {
        let worker = FnWorker::new("  ", |task| Ok(TaskResult::new(task)));
        let client = Arc::new(FixedClient {
            task: None,
            updates: Mutex::new(Vec::new()),
        });
        let err = TaskRunner::new(Arc::new(worker), client, RunnerConfig::default()).unwrap_err();
        assert!(matches!(err, RunnerError::EmptyTaskType));
    }

    #[test]
    fn test_worker_interval_overrides_config() {
        let worker = FnWorker::new("echo", |task| Ok(TaskResult::new(task)))
            .with_poll_interval(Duration::from_millis(42));
        let (runner, _) = runner(worker, None);
        assert_eq!(runner.poll_interval(), Duration::from_millis(42));
        assert_eq!(runner.worker_id(), "test-worker");
    }

    #[tokio::test]
    async fn test_no_task_skips_update() {
        let worker = FnWorker::new("echo", |task| Ok(TaskResult::new(task)));
        let (runner, client) = runner(worker, None);

        assert_eq!(runner.run_once().await, IterationOutcome::NoTask);
        assert!(client.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_result_ids_are_restamped() {
        // Worker builds its result from a different task; ids must follow the polled one
        let worker = FnWorker::new("echo", |_task| {
            Ok(TaskResult::new(&Task::new("other", "other-wf", "echo")).with_output("y", 2))
        });
        let (runner, client) = runner(worker, Some(Task::new("t1", "wf1", "echo")));

        let outcome = runner.poll_and_execute().await;
        assert_eq!(outcome, IterationOutcome::Reported(TaskResultStatus::Completed));

        let updates = client.updates.lock().unwrap();
        assert_eq!(updates[0].task_id, "t1");
        assert_eq!(updates[0].workflow_instance_id, "wf1");
        assert_eq!(updates[0].worker_id.as_deref(), Some("test-worker"));
        assert_eq!(updates[0].output_data["y"], 2);
    }

    #[tokio::test]
    async fn test_terminal_error_with_details() {
        let worker = FnWorker::new("charge", |_task| {
            Err(WorkerError::terminal("card declined").with_details(json!({"code": "E42"})))
        });
        let (runner, client) = runner(worker, Some(Task::new("t1", "wf1", "charge")));

        let outcome = runner.poll_and_execute().await;
        assert_eq!(
            outcome,
            IterationOutcome::Reported(TaskResultStatus::FailedWithTerminalError)
        );

        let updates = client.updates.lock().unwrap();
        assert_eq!(
            updates[0].reason_for_incompletion.as_deref(),
            Some("card declined")
        );
        assert_eq!(updates[0].output_data["error"], json!({"code": "E42"}));
    }

    #[tokio::test]
    async fn test_normal_return_is_reported_completed() {
        let worker = FnWorker::new("long", |task| {
            let mut result = TaskResult::in_progress(task, Duration::from_secs(10))
                .with_extend_lease(true)
                .with_output("step", 1);
            result.log("started");
            Ok(result)
        });
        let (runner, client) = runner(worker, Some(Task::new("t1", "wf1", "long")));

        let outcome = runner.poll_and_execute().await;
        assert_eq!(outcome, IterationOutcome::Reported(TaskResultStatus::Completed));

        let updates = client.updates.lock().unwrap();
        assert_eq!(updates[0].status, TaskResultStatus::Completed);
        assert_eq!(updates[0].callback_after_seconds, 0);
        assert!(updates[0].extend_lease);
        assert_eq!(updates[0].output_data["step"], 1);
        assert_eq!(updates[0].logs.len(), 1);
    }

    #[tokio::test]
    async fn test_returned_failure_status_is_overridden() {
        let worker = FnWorker::new("echo", |task| Ok(TaskResult::failed(task, "returned normally")));
        let (runner, client) = runner(worker, Some(Task::new("t2", "wf1", "echo")));

        let outcome = runner.poll_and_execute().await;
        assert_eq!(outcome, IterationOutcome::Reported(TaskResultStatus::Completed));

        let updates = client.updates.lock().unwrap();
        assert_eq!(updates[0].status, TaskResultStatus::Completed);
        assert!(updates[0].reason_for_incompletion.is_none());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bad input"));
        assert_eq!(panic_message(payload.as_ref()), "bad input");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "worker panicked");
    }
}
