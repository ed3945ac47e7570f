// Workflow resource: start and manage workflow executions

use tracing::info;

use crate::error::Result;
use crate::http::ApiClient;
use crate::models::{StartWorkflowRequest, Workflow};

#[derive(Clone, Debug)]
pub struct WorkflowResourceApi {
    api: ApiClient,
}

impl WorkflowResourceApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Start a workflow; returns the new workflow instance id
    pub async fn start(&self, request: &StartWorkflowRequest) -> Result<String> {
        let workflow_id = self.api.post(&["workflow"], &[], request).await?;
        let workflow_id = workflow_id.trim().trim_matches('"').to_string();
        info!(
            workflow_name = %request.name,
            workflow_id = %workflow_id,
            "Workflow started"
        );
        Ok(workflow_id)
    }

    pub async fn get(&self, workflow_id: &str, include_tasks: bool) -> Result<Workflow> {
        self.api
            .get(
                &["workflow", workflow_id],
                &[("includeTasks", include_tasks.to_string())],
            )
            .await
    }

    pub async fn terminate(&self, workflow_id: &str, reason: Option<&str>) -> Result<()> {
        let query: Vec<(&str, String)> = reason
            .map(|r| vec![("reason", r.to_string())])
            .unwrap_or_default();
        self.api.delete(&["workflow", workflow_id], &query).await
    }

    pub async fn pause(&self, workflow_id: &str) -> Result<()> {
        self.api
            .put::<()>(&["workflow", workflow_id, "pause"], &[], None)
            .await
    }

    pub async fn resume(&self, workflow_id: &str) -> Result<()> {
        self.api
            .put::<()>(&["workflow", workflow_id, "resume"], &[], None)
            .await
    }

    /// Retry the last failed task
    pub async fn retry(&self, workflow_id: &str) -> Result<()> {
        self.api
            .post_empty(&["workflow", workflow_id, "retry"], &[])
            .await
    }

    /// Restart a finished workflow from the beginning
    pub async fn restart(&self, workflow_id: &str) -> Result<()> {
        self.api
            .post_empty(&["workflow", workflow_id, "restart"], &[])
            .await
    }

    /// Delete a workflow and its history
    pub async fn remove(&self, workflow_id: &str) -> Result<()> {
        self.api
            .delete(&["workflow", workflow_id, "remove"], &[])
            .await
    }
}
