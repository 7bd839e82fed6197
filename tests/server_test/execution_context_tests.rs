//! Execution-context resolution through the in-memory workspace directory.

use std::sync::Arc;

use eyre::{Result, ensure};
use rstest::{fixture, rstest};
use skilder::server_test::{
    adapters::memory::InMemoryWorkspaceDirectory,
    domain::{RuntimeId, ToolId, WorkspaceId},
    services::{ExecutionContext, ExecutionContextResolver},
};

struct DirectoryContext {
    directory: Arc<InMemoryWorkspaceDirectory>,
    resolver: ExecutionContextResolver<InMemoryWorkspaceDirectory>,
}

#[fixture]
fn directory_context() -> DirectoryContext {
    let directory = Arc::new(InMemoryWorkspaceDirectory::new());
    let resolver = ExecutionContextResolver::new(directory.clone());
    DirectoryContext {
        directory,
        resolver,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tool_resolves_to_its_workspace_and_runtime(
    directory_context: DirectoryContext,
) -> Result<()> {
    let tool_id = ToolId::new("tool-read-file");
    directory_context
        .directory
        .set_tool_workspace(tool_id.clone(), WorkspaceId::new("ws-1"))?;
    directory_context
        .directory
        .set_execution_runtime(WorkspaceId::new("ws-1"), RuntimeId::new("edge-runtime"))?;

    let resolved = directory_context.resolver.context_for_tool(&tool_id).await?;

    ensure!(
        resolved
            == Some(ExecutionContext {
                workspace_id: WorkspaceId::new("ws-1"),
                runtime_id: Some(RuntimeId::new("edge-runtime")),
            }),
        "unexpected context {resolved:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tool_in_workspace_without_runtime_has_no_runtime(
    directory_context: DirectoryContext,
) -> Result<()> {
    let tool_id = ToolId::new("tool-echo");
    directory_context
        .directory
        .set_tool_workspace(tool_id.clone(), WorkspaceId::new("ws-2"))?;

    let resolved = directory_context.resolver.context_for_tool(&tool_id).await?;

    ensure!(
        resolved
            == Some(ExecutionContext {
                workspace_id: WorkspaceId::new("ws-2"),
                runtime_id: None,
            }),
        "unexpected context {resolved:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_tool_has_no_context(directory_context: DirectoryContext) -> Result<()> {
    let resolved = directory_context
        .resolver
        .context_for_tool(&ToolId::new("tool-missing"))
        .await?;

    ensure!(resolved.is_none(), "unexpected context {resolved:?}");
    Ok(())
}
