//! Typed wrappers over the server's REST resources

mod metadata;
mod task;
mod workflow;

pub use metadata::MetadataResourceApi;
pub use task::TaskResourceApi;
pub use workflow::WorkflowResourceApi;
