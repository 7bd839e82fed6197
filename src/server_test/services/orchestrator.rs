//! Facade through which API layers start and observe MCP server tests.

use super::TestSessionConfig;
use super::context::ExecutionContextResolver;
use super::fanout::TestProgressStream;
use super::registry::{SessionLease, TestSessionRegistry};
use super::router::LifecycleRouter;
use super::timeout::TimeoutGuard;
use crate::server_test::{
    domain::{McpServerTestParams, TestSessionHandle, TestSessionId},
    ports::{TestSessionBus, WorkspaceDirectory},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Orchestrates ad-hoc MCP server test sessions.
///
/// Each orchestrator owns its own [`TestSessionRegistry`]; sessions started
/// through one instance are invisible to another.
pub struct McpServerTestOrchestrator<B, W, C>
where
    B: TestSessionBus + 'static,
    W: WorkspaceDirectory + 'static,
    C: Clock + Send + Sync + 'static,
{
    bus: Arc<B>,
    resolver: ExecutionContextResolver<W>,
    clock: Arc<C>,
    registry: Arc<TestSessionRegistry>,
    config: TestSessionConfig,
}

impl<B, W, C> McpServerTestOrchestrator<B, W, C>
where
    B: TestSessionBus + 'static,
    W: WorkspaceDirectory + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an orchestrator with an empty session registry.
    #[must_use]
    pub fn new(bus: Arc<B>, directory: Arc<W>, clock: Arc<C>, config: TestSessionConfig) -> Self {
        let registry = Arc::new(TestSessionRegistry::new(&config));
        Self {
            bus,
            resolver: ExecutionContextResolver::new(directory),
            clock,
            registry,
            config,
        }
    }

    /// Returns the registry of live sessions.
    #[must_use]
    pub const fn registry(&self) -> &Arc<TestSessionRegistry> {
        &self.registry
    }

    /// Starts a test and returns its handle without waiting on the bus.
    ///
    /// The request is published from a background task, so the returned
    /// handle is always [`crate::server_test::domain::TestStage::Pending`].
    /// Failures surface later on the progress stream.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn start_test(&self, params: McpServerTestParams) -> TestSessionHandle {
        let (session_id, lease) = self.allocate_session();

        let guard = TimeoutGuard {
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            timeout: self.config.timeout,
            emit_timeout_event: self.config.emit_timeout_event,
        };
        guard.spawn(session_id.clone(), lease.timeout);

        info!(
            %session_id,
            server = params.name(),
            transport = %params.transport(),
            workspace = %params.workspace_id(),
            "starting MCP server test"
        );
        let router = LifecycleRouter {
            bus: Arc::clone(&self.bus),
            resolver: self.resolver.clone(),
            registry: Arc::clone(&self.registry),
        };
        router.spawn(session_id.clone(), params, lease.subscription);

        TestSessionHandle::pending(session_id)
    }

    fn allocate_session(&self) -> (TestSessionId, SessionLease) {
        loop {
            let session_id = TestSessionId::new();
            if let Some(lease) = self.registry.allocate(&session_id) {
                return (session_id, lease);
            }
        }
    }

    /// Returns a stream of lifecycle events for `session_id`.
    ///
    /// Observers of the same session all receive every event published after
    /// they attach, plus the replay buffer. Unknown or already cleaned-up
    /// sessions yield a stream that ends immediately.
    #[must_use]
    pub fn observe_progress(&self, session_id: &TestSessionId) -> TestProgressStream {
        self.registry.get_or_create(session_id).subscribe()
    }

    /// Cancels a live test, closing observer streams without error.
    ///
    /// Returns `false` when the session was already cleaned up.
    #[must_use]
    pub fn cancel_test(&self, session_id: &TestSessionId) -> bool {
        let cancelled = self.registry.cleanup(session_id);
        if cancelled {
            info!(%session_id, "cancelled MCP server test");
        }
        cancelled
    }

    /// Returns the number of sessions still awaiting a terminal stage.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }
}
