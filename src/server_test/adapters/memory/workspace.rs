//! In-memory workspace directory.

use crate::server_test::{
    domain::{RuntimeId, ToolId, WorkspaceId},
    ports::{WorkspaceDirectory, WorkspaceDirectoryError, WorkspaceDirectoryResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory tool/workspace/runtime lookup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspaceDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    tool_workspaces: HashMap<ToolId, WorkspaceId>,
    execution_runtimes: HashMap<WorkspaceId, RuntimeId>,
}

impl InMemoryWorkspaceDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records which workspace owns `tool_id`.
    ///
    /// # Errors
    ///
    /// Returns a query error when lock acquisition fails.
    pub fn set_tool_workspace(
        &self,
        tool_id: ToolId,
        workspace_id: WorkspaceId,
    ) -> WorkspaceDirectoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            WorkspaceDirectoryError::query(std::io::Error::other(err.to_string()))
        })?;
        state.tool_workspaces.insert(tool_id, workspace_id);
        Ok(())
    }

    /// Designates the runtime that executes `workspace_id`'s tests.
    ///
    /// # Errors
    ///
    /// Returns a query error when lock acquisition fails.
    pub fn set_execution_runtime(
        &self,
        workspace_id: WorkspaceId,
        runtime_id: RuntimeId,
    ) -> WorkspaceDirectoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            WorkspaceDirectoryError::query(std::io::Error::other(err.to_string()))
        })?;
        state.execution_runtimes.insert(workspace_id, runtime_id);
        Ok(())
    }
}

#[async_trait]
impl WorkspaceDirectory for InMemoryWorkspaceDirectory {
    async fn find_tool_workspace(
        &self,
        tool_id: &ToolId,
    ) -> WorkspaceDirectoryResult<Option<WorkspaceId>> {
        let state = self.state.read().map_err(|err| {
            WorkspaceDirectoryError::query(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.tool_workspaces.get(tool_id).cloned())
    }

    async fn find_execution_runtime(
        &self,
        workspace_id: &WorkspaceId,
    ) -> WorkspaceDirectoryResult<Option<RuntimeId>> {
        let state = self.state.read().map_err(|err| {
            WorkspaceDirectoryError::query(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.execution_runtimes.get(workspace_id).cloned())
    }
}
