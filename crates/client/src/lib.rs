//! # Conductor Client
//!
//! HTTP client for a Conductor workflow-orchestration server.
//!
//! - [`resources::TaskResourceApi`]: poll for tasks, report results
//! - [`resources::WorkflowResourceApi`]: start and manage workflow executions
//! - [`resources::MetadataResourceApi`]: register task and workflow definitions
//! - [`definition`]: builder for workflow graphs (switch, fork/join, loops, sub-workflows)
//!
//! ## Example
//!
//! ```ignore
//! use conductor_client::{ClientConfig, ConductorClient};
//! use conductor_client::models::StartWorkflowRequest;
//!
//! let client = ConductorClient::new(&ClientConfig::from_env()?)?;
//! let workflow_id = client
//!     .workflows()
//!     .start(&StartWorkflowRequest::new("order_flow"))
//!     .await?;
//! ```

pub mod config;
pub mod definition;
pub mod error;
pub mod http;
pub mod models;
pub mod resources;

pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use http::ApiClient;
pub use resources::{MetadataResourceApi, TaskResourceApi, WorkflowResourceApi};

/// Entry point bundling the resource APIs over one connection pool
#[derive(Clone, Debug)]
pub struct ConductorClient {
    api: ApiClient,
}

impl ConductorClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    pub fn tasks(&self) -> TaskResourceApi {
        TaskResourceApi::new(self.api.clone())
    }

    pub fn workflows(&self) -> WorkflowResourceApi {
        WorkflowResourceApi::new(self.api.clone())
    }

    pub fn metadata(&self) -> MetadataResourceApi {
        MetadataResourceApi::new(self.api.clone())
    }
}
