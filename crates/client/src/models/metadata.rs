//! Task and workflow definitions registered with the server
//!
//! Construction helpers for [`WorkflowTask`] and [`WorkflowDef`] live in
//! [`crate::definition`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the server spaces retries of a failed task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryLogic {
    #[default]
    Fixed,
    ExponentialBackoff,
    LinearBackoff,
}

/// What the server does when a task times out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeoutPolicy {
    #[default]
    TimeOutWf,
    Retry,
    AlertOnly,
}

/// What the server does when a whole workflow times out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowTimeoutPolicy {
    #[default]
    TimeOutWf,
    AlertOnly,
}

/// Task definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub retry_count: u32,
    pub retry_logic: RetryLogic,
    pub retry_delay_seconds: u64,
    pub timeout_seconds: u64,
    pub timeout_policy: TimeoutPolicy,
    pub response_timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrent_exec_limit: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub input_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
}

impl TaskDef {
    /// Definition with the server's usual defaults: 3 fixed retries, 60s delay,
    /// 600s response timeout
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retry_count: 3,
            retry_delay_seconds: 60,
            response_timeout_seconds: 600,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_retry(mut self, count: u32, logic: RetryLogic, delay_seconds: u64) -> Self {
        self.retry_count = count;
        self.retry_logic = logic;
        self.retry_delay_seconds = delay_seconds;
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64, policy: TimeoutPolicy) -> Self {
        self.timeout_seconds = timeout_seconds;
        self.timeout_policy = policy;
        self
    }

    pub fn with_response_timeout(mut self, seconds: u64) -> Self {
        self.response_timeout_seconds = seconds;
        self
    }

    pub fn with_concurrent_exec_limit(mut self, limit: u32) -> Self {
        self.concurrent_exec_limit = Some(limit);
        self
    }

    pub fn with_owner_email(mut self, email: impl Into<String>) -> Self {
        self.owner_email = Some(email.into());
        self
    }
}

/// Kind of a workflow step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Executed by a polling worker
    #[default]
    Simple,
    Switch,
    ForkJoin,
    Join,
    DoWhile,
    SubWorkflow,
    Wait,
    Terminate,
    Http,
    Inline,
    #[serde(other)]
    Unknown,
}

/// Reference to the workflow a `SUB_WORKFLOW` step starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubWorkflowParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

/// One step in a workflow definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowTask {
    pub name: String,
    pub task_reference_name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub input_parameters: Map<String, Value>,
    pub optional: bool,

    // SWITCH
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub decision_cases: BTreeMap<String, Vec<WorkflowTask>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_case: Vec<WorkflowTask>,

    // FORK_JOIN / JOIN
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fork_tasks: Vec<Vec<WorkflowTask>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub join_on: Vec<String>,

    // DO_WHILE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_condition: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loop_over: Vec<WorkflowTask>,

    // SUB_WORKFLOW
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_workflow_param: Option<SubWorkflowParams>,
}

impl WorkflowTask {
    /// Every step nested under this one (switch cases, fork branches, loop body)
    pub fn children(&self) -> impl Iterator<Item = &WorkflowTask> {
        self.decision_cases
            .values()
            .flatten()
            .chain(self.default_case.iter())
            .chain(self.fork_tasks.iter().flatten())
            .chain(self.loop_over.iter())
    }
}

/// Workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default)]
    pub tasks: Vec<WorkflowTask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub output_parameters: Map<String, Value>,
    #[serde(default = "default_schema_version")]
    pub schema_version: i32,
    #[serde(default = "default_restartable")]
    pub restartable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub timeout_policy: WorkflowTimeoutPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_workflow: Option<String>,
}

fn default_version() -> i32 {
    1
}

fn default_schema_version() -> i32 {
    2
}

fn default_restartable() -> bool {
    true
}
