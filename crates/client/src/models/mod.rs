//! Data-transfer models exchanged with the server

mod metadata;
mod task;
mod task_result;
mod workflow;

pub use metadata::{
    RetryLogic, SubWorkflowParams, TaskDef, TaskType, TimeoutPolicy, WorkflowDef, WorkflowTask,
    WorkflowTimeoutPolicy,
};
pub use task::{Task, TaskStatus};
pub use task_result::{TaskExecLog, TaskResult, TaskResultStatus};
pub use workflow::{StartWorkflowRequest, Workflow, WorkflowStatus};
