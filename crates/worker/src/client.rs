// Remote operations consumed by the task runner
// Decision: Runner depends on this trait, not on the HTTP client, so tests can script the server

use async_trait::async_trait;
use conductor_client::models::{Task, TaskResult};
use conductor_client::{ClientError, TaskResourceApi};

/// Poll and update operations of the orchestration server
#[async_trait]
pub trait TaskClient: Send + Sync + 'static {
    /// Fetch one task of `task_type`; `Ok(None)` when none is available
    async fn poll(
        &self,
        task_type: &str,
        worker_id: &str,
        domain: Option<&str>,
    ) -> Result<Option<Task>, ClientError>;

    /// Report the result of a task
    async fn update(&self, result: &TaskResult) -> Result<(), ClientError>;
}

#[async_trait]
impl TaskClient for TaskResourceApi {
    async fn poll(
        &self,
        task_type: &str,
        worker_id: &str,
        domain: Option<&str>,
    ) -> Result<Option<Task>, ClientError> {
        TaskResourceApi::poll(self, task_type, Some(worker_id), domain).await
    }

    async fn update(&self, result: &TaskResult) -> Result<(), ClientError> {
        TaskResourceApi::update(self, result).await.map(|_| ())
    }
}
