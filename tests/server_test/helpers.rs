//! Shared fixtures for in-memory server test integration tests.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, eyre};
use futures::StreamExt;
use mockable::DefaultClock;
use rstest::fixture;
use skilder::server_test::{
    adapters::memory::{InMemoryTestSessionBus, InMemoryWorkspaceDirectory},
    domain::{LifecycleEvent, McpServerTestParams, McpTransportKind, TestSessionId, WorkspaceId},
    services::{
        McpServerTestOrchestrator, TestProgressError, TestProgressStream, TestSessionConfig,
    },
};

/// Orchestrator wired to in-memory adapters.
pub type TestOrchestrator =
    McpServerTestOrchestrator<InMemoryTestSessionBus, InMemoryWorkspaceDirectory, DefaultClock>;

/// Items an observer collects from a progress stream.
pub type Progress = Vec<std::result::Result<LifecycleEvent, TestProgressError>>;

/// Upper bound on how long a test waits for background tasks.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Orchestrator plus handles on its collaborators.
pub struct TestContext {
    pub bus: Arc<InMemoryTestSessionBus>,
    pub directory: Arc<InMemoryWorkspaceDirectory>,
    pub orchestrator: TestOrchestrator,
}

/// Builds a context with the given configuration.
pub fn context_with(config: TestSessionConfig) -> TestContext {
    let bus = Arc::new(InMemoryTestSessionBus::new());
    let directory = Arc::new(InMemoryWorkspaceDirectory::new());
    let orchestrator = McpServerTestOrchestrator::new(
        bus.clone(),
        directory.clone(),
        Arc::new(DefaultClock),
        config,
    );
    TestContext {
        bus,
        directory,
        orchestrator,
    }
}

#[fixture]
pub fn context() -> TestContext {
    context_with(TestSessionConfig::default())
}

/// Parameters for the canonical `fs-server` test.
pub fn fs_server_params() -> McpServerTestParams {
    McpServerTestParams::new(
        "fs-server",
        "https://example/repo",
        McpTransportKind::Sse,
        "{}",
        WorkspaceId::new("ws-1"),
    )
}

/// Waits until a predicate over shared state holds.
pub async fn wait_until(mut condition: impl FnMut() -> Result<bool>) -> Result<()> {
    tokio::time::timeout(WAIT_LIMIT, async {
        while !condition()? {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        Ok::<_, eyre::Report>(())
    })
    .await
    .map_err(|_| eyre!("condition not reached within {WAIT_LIMIT:?}"))?
}

/// Waits until the session's lifecycle subscription is open on the bus.
pub async fn wait_for_subscription(
    bus: &InMemoryTestSessionBus,
    session_id: &TestSessionId,
) -> Result<()> {
    wait_until(|| Ok(bus.is_subscribed(session_id)?)).await
}

/// Collects a progress stream, failing if it does not end in time.
pub async fn collect_progress(stream: TestProgressStream) -> Result<Progress> {
    tokio::time::timeout(WAIT_LIMIT, stream.collect::<Vec<_>>())
        .await
        .map_err(|_| eyre!("progress stream did not close within {WAIT_LIMIT:?}"))
}
