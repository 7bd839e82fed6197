//! Data-layer port resolving where a test should execute.

use crate::server_test::domain::{RuntimeId, ToolId, WorkspaceId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for workspace directory lookups.
pub type WorkspaceDirectoryResult<T> = Result<T, WorkspaceDirectoryError>;

/// Read-only view of the graph database needed to address test requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkspaceDirectory: Send + Sync {
    /// Finds the workspace that owns a tool.
    async fn find_tool_workspace(
        &self,
        tool_id: &ToolId,
    ) -> WorkspaceDirectoryResult<Option<WorkspaceId>>;

    /// Finds the runtime a workspace designates for executing tools.
    async fn find_execution_runtime(
        &self,
        workspace_id: &WorkspaceId,
    ) -> WorkspaceDirectoryResult<Option<RuntimeId>>;
}

/// Errors returned by workspace directory adapters.
#[derive(Debug, Clone, Error)]
pub enum WorkspaceDirectoryError {
    /// The underlying query failed.
    #[error("workspace directory query failed: {0}")]
    Query(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkspaceDirectoryError {
    /// Wraps a query failure.
    pub fn query(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Query(Arc::new(err))
    }
}
