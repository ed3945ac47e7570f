//! Task (work unit) assigned by the server

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-side task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Canceled,
    Failed,
    FailedWithTerminalError,
    Completed,
    CompletedWithErrors,
    TimedOut,
    Skipped,
    /// Status added by a newer server version
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Whether the server considers the task finished
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            TaskStatus::Scheduled | TaskStatus::InProgress | TaskStatus::Unknown
        )
    }
}

/// One unit of work polled from the server
///
/// Only `task_id`, `workflow_instance_id`, `task_type` and `input_data` matter to
/// the worker runtime; the remaining fields are informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub task_id: String,
    pub workflow_instance_id: String,
    pub task_type: String,
    pub input_data: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_task_name: Option<String>,
    pub retry_count: u32,
    pub poll_count: u32,
    pub callback_after_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub response_timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<String>,
}

impl Task {
    /// Create a task with the identifying fields set
    pub fn new(
        task_id: impl Into<String>,
        workflow_instance_id: impl Into<String>,
        task_type: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            workflow_instance_id: workflow_instance_id.into(),
            task_type: task_type.into(),
            ..Default::default()
        }
    }

    /// Set the input payload
    pub fn with_input(mut self, input: Map<String, Value>) -> Self {
        self.input_data = input;
        self
    }

    /// Look up one input value
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.input_data.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_server_task() {
        let body = json!({
            "taskId": "t1",
            "workflowInstanceId": "wf1",
            "taskType": "echo",
            "referenceTaskName": "echo_ref",
            "status": "IN_PROGRESS",
            "inputData": {"x": 1},
            "pollCount": 1,
            "responseTimeoutSeconds": 600,
            "someFutureField": true
        });

        let task: Task = serde_json::from_value(body).unwrap();
        assert_eq!(task.task_id, "t1");
        assert_eq!(task.workflow_instance_id, "wf1");
        assert_eq!(task.task_type, "echo");
        assert_eq!(task.status, Some(TaskStatus::InProgress));
        assert_eq!(task.input("x"), Some(&json!(1)));
        assert_eq!(task.poll_count, 1);
        assert_eq!(task.retry_count, 0);
    }

    #[test]
    fn test_unknown_status() {
        let task: Task = serde_json::from_value(json!({"status": "BRAND_NEW"})).unwrap();
        assert_eq!(task.status, Some(TaskStatus::Unknown));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::FailedWithTerminalError.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(!TaskStatus::Scheduled.is_terminal());
    }
}
