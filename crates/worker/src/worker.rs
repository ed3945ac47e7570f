//! Worker contract
//!
//! A worker is the pluggable business logic behind one task type. The runner
//! polls for tasks of [`Worker::task_type`], hands each to [`Worker::process`]
//! and reports `COMPLETED` on a normal return, `FAILED` on an error or panic.

use std::sync::Arc;
use std::time::Duration;

use conductor_client::models::{Task, TaskResult, TaskResultStatus};
use serde::{Deserialize, Serialize};

/// Error returned by a worker's processing function
///
/// Terminal errors tell the server not to retry the task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerError {
    /// Error message, reported as the task's reason for incompletion
    pub message: String,

    /// Whether retrying the task is pointless
    pub terminal: bool,

    /// Additional error details, added to the result output under `error`
    pub details: Option<serde_json::Value>,
}

impl WorkerError {
    /// Failure the server may retry
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            terminal: false,
            details: None,
        }
    }

    /// Failure the server must not retry
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            terminal: true,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Status this error is reported with
    pub fn status(&self) -> TaskResultStatus {
        if self.terminal {
            TaskResultStatus::FailedWithTerminalError
        } else {
            TaskResultStatus::Failed
        }
    }
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkerError {}

impl From<anyhow::Error> for WorkerError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate form keeps the context chain: "outer: inner"
        Self::failed(format!("{:#}", err))
    }
}

/// Business logic for one task type
///
/// `process` may block; the runner calls it on a blocking thread and converts
/// errors and panics into failed results.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl Worker for Echo {
///     fn task_type(&self) -> &str {
///         "echo"
///     }
///
///     fn process(&self, task: &Task) -> Result<TaskResult, WorkerError> {
///         Ok(TaskResult::new(task).with_output_data(task.input_data.clone()))
///     }
/// }
/// ```
pub trait Worker: Send + Sync + 'static {
    /// Task type to poll for; must not be empty
    fn task_type(&self) -> &str;

    /// Process one task
    fn process(&self, task: &Task) -> Result<TaskResult, WorkerError>;

    /// Per-worker override of the runner's poll interval
    fn poll_interval(&self) -> Option<Duration> {
        None
    }

    /// Identifier attached to polls and results
    fn identity(&self) -> String {
        default_identity()
    }
}

/// Local hostname, or `"unknown"` if it cannot be read
pub fn default_identity() -> String {
    whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string())
}

type ProcessFn = dyn Fn(&Task) -> Result<TaskResult, WorkerError> + Send + Sync;

/// Worker backed by a closure
///
/// ```ignore
/// let worker = FnWorker::new("echo", |task| {
///     Ok(TaskResult::new(task).with_output("echo", task.input("text").cloned().unwrap_or_default()))
/// });
/// ```
#[derive(Clone)]
pub struct FnWorker {
    task_type: String,
    process: Arc<ProcessFn>,
    poll_interval: Option<Duration>,
    identity: Option<String>,
}

impl FnWorker {
    pub fn new<F>(task_type: impl Into<String>, process: F) -> Self
    where
        F: Fn(&Task) -> Result<TaskResult, WorkerError> + Send + Sync + 'static,
    {
        Self {
            task_type: task_type.into(),
            process: Arc::new(process),
            poll_interval: None,
            identity: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}

impl std::fmt::Debug for FnWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnWorker")
            .field("task_type", &self.task_type)
            .field("poll_interval", &self.poll_interval)
            .field("identity", &self.identity)
            .finish()
    }
}

impl Worker for FnWorker {
    fn task_type(&self) -> &str {
        &self.task_type
    }

    fn process(&self, task: &Task) -> Result<TaskResult, WorkerError> {
        (self.process)(task)
    }

    fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    fn identity(&self) -> String {
        self.identity.clone().unwrap_or_else(default_identity)
    }
}
