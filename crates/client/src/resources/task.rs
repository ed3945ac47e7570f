// Task resource: polling, result updates, execution logs

use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::http::ApiClient;
use crate::models::{Task, TaskResult};

#[derive(Clone, Debug)]
pub struct TaskResourceApi {
    api: ApiClient,
}

impl TaskResourceApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Poll for one task of `task_type`
    ///
    /// `Ok(None)` means no task is currently available.
    #[instrument(skip(self), level = "trace")]
    pub async fn poll(
        &self,
        task_type: &str,
        worker_id: Option<&str>,
        domain: Option<&str>,
    ) -> Result<Option<Task>> {
        let query = poll_query(worker_id, domain);
        self.api
            .get_optional(&["tasks", "poll", task_type], &query)
            .await
    }

    /// Poll for up to `count` tasks, letting the server hold the request for `timeout`
    #[instrument(skip(self), level = "trace")]
    pub async fn batch_poll(
        &self,
        task_type: &str,
        worker_id: Option<&str>,
        domain: Option<&str>,
        count: u32,
        timeout: Duration,
    ) -> Result<Vec<Task>> {
        let mut query = poll_query(worker_id, domain);
        query.push(("count", count.max(1).to_string()));
        query.push(("timeout", timeout.as_millis().to_string()));

        let tasks: Option<Vec<Task>> = self
            .api
            .get_optional(&["tasks", "poll", "batch", task_type], &query)
            .await?;
        Ok(tasks.unwrap_or_default())
    }

    /// Report a task result; returns the server's acknowledgement text (the task id)
    pub async fn update(&self, result: &TaskResult) -> Result<String> {
        let ack = self.api.post(&["tasks"], &[], result).await?;
        debug!(
            task_id = %result.task_id,
            status = %result.status,
            "Task result accepted"
        );
        Ok(ack)
    }

    /// Append an execution log line to a task
    pub async fn add_log(&self, task_id: &str, message: &str) -> Result<()> {
        self.api.post(&["tasks", task_id, "log"], &[], message).await?;
        Ok(())
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.api.get(&["tasks", task_id], &[]).await
    }
}

fn poll_query(worker_id: Option<&str>, domain: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(worker_id) = worker_id {
        query.push(("workerid", worker_id.to_string()));
    }
    if let Some(domain) = domain.filter(|d| !d.is_empty()) {
        query.push(("domain", domain.to_string()));
    }
    query
}
