//! Message bus port used to reach the remote test workers.

use crate::server_test::domain::{McpServerTestRequest, TestSessionId};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for message bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Raw lifecycle payloads delivered on a session-scoped subscription.
///
/// The bus must preserve per-subject ordering.
pub type LifecycleMessages = BoxStream<'static, BusResult<Vec<u8>>>;

/// Publish/subscribe contract for MCP server test traffic.
#[async_trait]
pub trait TestSessionBus: Send + Sync {
    /// Publishes a start-test request.
    ///
    /// Implementations must not wait for a reply from a worker; returning
    /// means the message was handed to the bus, nothing more.
    async fn publish_request(&self, request: &McpServerTestRequest) -> BusResult<()>;

    /// Opens a subscription scoped to one session's lifecycle subject.
    async fn subscribe_lifecycle(
        &self,
        session_id: &TestSessionId,
    ) -> BusResult<LifecycleSubscription>;
}

/// Explicit close operation for an open subscription.
#[async_trait]
pub trait SubscriptionDrain: Send + Sync {
    /// Drains buffered messages and unsubscribes.
    async fn drain(&self) -> BusResult<()>;
}

/// An open lifecycle subscription: the message stream plus its closer.
pub struct LifecycleSubscription {
    messages: LifecycleMessages,
    drain: Box<dyn SubscriptionDrain>,
}

impl LifecycleSubscription {
    /// Bundles a message stream with the handle that closes it.
    #[must_use]
    pub fn new(messages: LifecycleMessages, drain: Box<dyn SubscriptionDrain>) -> Self {
        Self { messages, drain }
    }

    /// Splits the subscription so the stream can be consumed while the
    /// closer is kept for teardown.
    #[must_use]
    pub fn into_parts(self) -> (LifecycleMessages, Box<dyn SubscriptionDrain>) {
        (self.messages, self.drain)
    }
}

impl fmt::Debug for LifecycleSubscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LifecycleSubscription")
            .finish_non_exhaustive()
    }
}

/// Errors returned by message bus adapters.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// The bus connection is closed.
    #[error("message bus connection is closed")]
    Closed,

    /// A request could not be published.
    #[error("failed to publish on subject {subject}: {reason}")]
    Publish {
        /// Subject the publish targeted.
        subject: String,
        /// Reason string.
        reason: String,
    },

    /// A subscription could not be opened.
    #[error("failed to subscribe to subject {subject}: {reason}")]
    Subscribe {
        /// Subject the subscription targeted.
        subject: String,
        /// Reason string.
        reason: String,
    },

    /// A subscription refused to drain.
    #[error("failed to drain subscription on subject {subject}: {reason}")]
    Drain {
        /// Subject of the subscription.
        subject: String,
        /// Reason string.
        reason: String,
    },

    /// Generic transport failure while receiving.
    #[error("message bus transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl BusError {
    /// Wraps a transport failure from the bus client.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
