//! Result reported back for a polled task

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::task::Task;

/// Status a worker reports for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskResultStatus {
    Completed,
    /// Failed, the server may retry per the task definition
    Failed,
    /// Failed, the server must not retry
    FailedWithTerminalError,
    /// Still running; the server re-queues after `callback_after_seconds`
    InProgress,
}

impl TaskResultStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskResultStatus::InProgress)
    }
}

impl std::fmt::Display for TaskResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::FailedWithTerminalError => write!(f, "FAILED_WITH_TERMINAL_ERROR"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
        }
    }
}

/// One execution log line attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExecLog {
    pub log: String,
    pub task_id: String,
    /// Epoch milliseconds
    pub created_time: i64,
}

/// Outcome of processing one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub workflow_instance_id: String,
    pub task_id: String,
    pub status: TaskResultStatus,
    #[serde(default)]
    pub output_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_incompletion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub callback_after_seconds: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<TaskExecLog>,
    /// Asks the server to extend the response timeout; not interpreted locally
    #[serde(default)]
    pub extend_lease: bool,
}

impl TaskResult {
    /// Completed result for `task` with empty output
    pub fn new(task: &Task) -> Self {
        Self {
            workflow_instance_id: task.workflow_instance_id.clone(),
            task_id: task.task_id.clone(),
            status: TaskResultStatus::Completed,
            output_data: Map::new(),
            reason_for_incompletion: None,
            worker_id: None,
            callback_after_seconds: 0,
            logs: Vec::new(),
            extend_lease: false,
        }
    }

    /// Retryable failure
    pub fn failed(task: &Task, reason: impl Into<String>) -> Self {
        Self::new(task).with_failure(TaskResultStatus::Failed, reason)
    }

    /// Non-retryable failure
    pub fn failed_with_terminal_error(task: &Task, reason: impl Into<String>) -> Self {
        Self::new(task).with_failure(TaskResultStatus::FailedWithTerminalError, reason)
    }

    /// Still running; the server hands the task out again after `callback_after`
    pub fn in_progress(task: &Task, callback_after: Duration) -> Self {
        let mut result = Self::new(task);
        result.status = TaskResultStatus::InProgress;
        result.callback_after_seconds = callback_after.as_secs();
        result
    }

    /// Set a failure status and reason
    pub fn with_failure(mut self, status: TaskResultStatus, reason: impl Into<String>) -> Self {
        self.status = status;
        self.reason_for_incompletion = Some(reason.into());
        self
    }

    /// Add one output value
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_output(key, value);
        self
    }

    /// Replace the whole output map
    pub fn with_output_data(mut self, output: Map<String, Value>) -> Self {
        self.output_data = output;
        self
    }

    pub fn with_extend_lease(mut self, extend: bool) -> Self {
        self.extend_lease = extend;
        self
    }

    pub fn add_output(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.output_data.insert(key.into(), value.into());
    }

    /// Append an execution log line stamped with the current time
    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(TaskExecLog {
            log: message.into(),
            task_id: self.task_id.clone(),
            created_time: Utc::now().timestamp_millis(),
        });
    }
}
