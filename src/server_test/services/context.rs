//! Resolution of where a test request should execute.

use crate::server_test::{
    domain::{RuntimeId, ToolId, WorkspaceId},
    ports::{WorkspaceDirectory, WorkspaceDirectoryResult},
};
use std::sync::Arc;
use tracing::warn;

/// Workspace and designated runtime a test or tool call executes under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Runtime designated by the workspace, if any.
    pub runtime_id: Option<RuntimeId>,
}

/// Looks up execution targets through the workspace directory.
#[derive(Debug)]
pub struct ExecutionContextResolver<W>
where
    W: WorkspaceDirectory,
{
    directory: Arc<W>,
}

impl<W> Clone for ExecutionContextResolver<W>
where
    W: WorkspaceDirectory,
{
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<W> ExecutionContextResolver<W>
where
    W: WorkspaceDirectory,
{
    /// Creates a resolver over `directory`.
    #[must_use]
    pub const fn new(directory: Arc<W>) -> Self {
        Self { directory }
    }

    /// Returns the runtime `workspace_id` designates, treating lookup
    /// failures as "none designated".
    ///
    /// Workers pick a default runtime for unaddressed requests, so a failed
    /// lookup degrades the test rather than preventing it.
    pub async fn runtime_for_workspace(&self, workspace_id: &WorkspaceId) -> Option<RuntimeId> {
        match self.directory.find_execution_runtime(workspace_id).await {
            Ok(runtime_id) => runtime_id,
            Err(err) => {
                warn!(%workspace_id, error = %err, "execution runtime lookup failed");
                None
            }
        }
    }

    /// Resolves the owning workspace of `tool_id` and that workspace's
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns directory errors from either lookup.
    pub async fn context_for_tool(
        &self,
        tool_id: &ToolId,
    ) -> WorkspaceDirectoryResult<Option<ExecutionContext>> {
        let Some(workspace_id) = self.directory.find_tool_workspace(tool_id).await? else {
            return Ok(None);
        };
        let runtime_id = self.directory.find_execution_runtime(&workspace_id).await?;
        Ok(Some(ExecutionContext {
            workspace_id,
            runtime_id,
        }))
    }
}
