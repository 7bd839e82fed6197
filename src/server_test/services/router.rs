//! Per-session task relaying worker lifecycle events to observers.

use super::context::ExecutionContextResolver;
use super::fanout::{FanoutItem, TestProgressError};
use super::registry::TestSessionRegistry;
use crate::server_test::{
    domain::{McpServerTestParams, McpServerTestRequest, TestSessionId, TestStage},
    ports::{
        BusResult, LifecycleMessages, LifecycleSubscription, SubscriptionDrain, TestSessionBus,
        WorkspaceDirectory, wire,
    },
};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives one session: publishes the request and relays its lifecycle.
pub(crate) struct LifecycleRouter<B, W>
where
    B: TestSessionBus + 'static,
    W: WorkspaceDirectory + 'static,
{
    pub(crate) bus: Arc<B>,
    pub(crate) resolver: ExecutionContextResolver<W>,
    pub(crate) registry: Arc<TestSessionRegistry>,
}

enum Consumed {
    Terminal,
    Cancelled,
    Failed,
}

impl<B, W> LifecycleRouter<B, W>
where
    B: TestSessionBus + 'static,
    W: WorkspaceDirectory + 'static,
{
    /// Spawns the session task.
    ///
    /// The task subscribes before publishing so no event can outrun the
    /// subscription. Cancelling `cancel` stops it at its next suspension
    /// point; once a subscription is open the task always drains it before
    /// exiting.
    pub(crate) fn spawn(
        self,
        session_id: TestSessionId,
        params: McpServerTestParams,
        cancel: CancellationToken,
    ) {
        tokio::spawn(async move { self.run(&session_id, params, &cancel).await });
    }

    async fn run(
        &self,
        session_id: &TestSessionId,
        params: McpServerTestParams,
        cancel: &CancellationToken,
    ) {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%session_id, "test session cancelled before subscribing");
                return;
            }
            opened = self.open(session_id, params) => opened,
        };
        let Some((request, subscription)) = opened else {
            return;
        };
        let (messages, drain) = subscription.into_parts();

        match self.bus.publish_request(&request).await {
            Ok(()) => info!(
                %session_id,
                server = request.params().name(),
                runtime = ?request.runtime_id(),
                "published MCP server test request"
            ),
            Err(err) => {
                error!(%session_id, error = %err, "failed to publish test request");
                self.fail(session_id, err.to_string());
            }
        }

        if !cancel.is_cancelled() {
            let outcome = self.consume(session_id, messages, cancel).await;
            debug!(%session_id, outcome = outcome.as_str(), "lifecycle consumption stopped");
        }
        close_subscription(session_id, drain.as_ref()).await;
    }

    /// Resolves the execution runtime and opens the lifecycle subscription.
    async fn open(
        &self,
        session_id: &TestSessionId,
        params: McpServerTestParams,
    ) -> Option<(McpServerTestRequest, LifecycleSubscription)> {
        let runtime_id = self
            .resolver
            .runtime_for_workspace(params.workspace_id())
            .await;

        match self.bus.subscribe_lifecycle(session_id).await {
            Ok(subscription) => {
                let request =
                    McpServerTestRequest::new(session_id.clone(), params).with_runtime(runtime_id);
                Some((request, subscription))
            }
            Err(err) => {
                error!(%session_id, error = %err, "failed to subscribe to test lifecycle");
                self.fail(session_id, err.to_string());
                None
            }
        }
    }

    async fn consume(
        &self,
        session_id: &TestSessionId,
        mut messages: LifecycleMessages,
        cancel: &CancellationToken,
    ) -> Consumed {
        let mut current = TestStage::Pending;
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Consumed::Cancelled,
                next = messages.next() => next,
            };

            let payload = match next {
                Some(Ok(payload)) => payload,
                Some(Err(err)) => {
                    error!(%session_id, error = %err, "test lifecycle subscription failed");
                    self.fail(session_id, err.to_string());
                    return Consumed::Failed;
                }
                None => {
                    warn!(%session_id, "test lifecycle subscription ended before a terminal stage");
                    self.fail(
                        session_id,
                        "lifecycle subscription closed before a terminal stage".to_owned(),
                    );
                    return Consumed::Failed;
                }
            };

            let event = match wire::decode_lifecycle_event(session_id, &payload) {
                Ok(event) => event,
                Err(err) => {
                    warn!(%session_id, error = %err, "discarding undecodable lifecycle message");
                    continue;
                }
            };

            if !current.can_advance_to(event.stage()) {
                warn!(
                    %session_id,
                    current = %current,
                    received = %event.stage(),
                    "discarding out-of-order lifecycle event"
                );
                continue;
            }
            current = event.stage();

            if event.is_terminal() {
                info!(%session_id, stage = %current, "test session reached terminal stage");
                if !self.registry.finish(session_id, Some(FanoutItem::Event(event))) {
                    debug!(%session_id, "terminal event arrived after session cleanup");
                }
                return Consumed::Terminal;
            }
            if !self.registry.publish(session_id, FanoutItem::Event(event)) {
                debug!(
                    %session_id,
                    stage = %current,
                    "lifecycle event arrived after session cleanup"
                );
            }
        }
    }

    fn fail(&self, session_id: &TestSessionId, reason: String) {
        let failure = FanoutItem::Error(TestProgressError::Transport(reason));
        if !self.registry.finish(session_id, Some(failure)) {
            debug!(%session_id, "transport failure after session cleanup");
        }
    }
}

impl Consumed {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

async fn close_subscription(session_id: &TestSessionId, drain: &dyn SubscriptionDrain) {
    let result: BusResult<()> = drain.drain().await;
    if let Err(err) = result {
        warn!(%session_id, error = %err, "failed to drain test lifecycle subscription");
    }
}
