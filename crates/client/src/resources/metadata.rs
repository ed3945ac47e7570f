// Metadata resource: task and workflow definitions

use tracing::info;

use crate::error::Result;
use crate::http::ApiClient;
use crate::models::{TaskDef, WorkflowDef};

#[derive(Clone, Debug)]
pub struct MetadataResourceApi {
    api: ApiClient,
}

impl MetadataResourceApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn register_task_defs(&self, defs: &[TaskDef]) -> Result<()> {
        self.api.post(&["metadata", "taskdefs"], &[], defs).await?;
        info!(count = defs.len(), "Registered task definitions");
        Ok(())
    }

    pub async fn update_task_def(&self, def: &TaskDef) -> Result<()> {
        self.api
            .put(&["metadata", "taskdefs"], &[], Some(def))
            .await
    }

    pub async fn get_task_def(&self, name: &str) -> Result<TaskDef> {
        self.api.get(&["metadata", "taskdefs", name], &[]).await
    }

    pub async fn unregister_task_def(&self, name: &str) -> Result<()> {
        self.api.delete(&["metadata", "taskdefs", name], &[]).await
    }

    pub async fn register_workflow_def(&self, def: &WorkflowDef) -> Result<()> {
        self.api.post(&["metadata", "workflow"], &[], def).await?;
        info!(
            workflow_name = %def.name,
            version = def.version,
            "Registered workflow definition"
        );
        Ok(())
    }

    /// Create or overwrite several workflow definitions
    pub async fn update_workflow_defs(&self, defs: &[WorkflowDef]) -> Result<()> {
        self.api
            .put(&["metadata", "workflow"], &[], Some(defs))
            .await
    }

    /// Fetch a definition; the latest version when `version` is `None`
    pub async fn get_workflow_def(&self, name: &str, version: Option<i32>) -> Result<WorkflowDef> {
        let query: Vec<(&str, String)> = version
            .map(|v| vec![("version", v.to_string())])
            .unwrap_or_default();
        self.api.get(&["metadata", "workflow", name], &query).await
    }

    pub async fn unregister_workflow_def(&self, name: &str, version: i32) -> Result<()> {
        let version = version.to_string();
        self.api
            .delete(&["metadata", "workflow", name, &version], &[])
            .await
    }
}
