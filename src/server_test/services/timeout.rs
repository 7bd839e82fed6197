//! Timeout guard forcing cleanup of sessions that never finish.

use super::fanout::FanoutItem;
use super::registry::TestSessionRegistry;
use crate::server_test::domain::{LifecycleEvent, TestSessionId};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Settings for one session's timeout guard.
#[derive(Debug)]
pub(crate) struct TimeoutGuard<C>
where
    C: Clock + Send + Sync + 'static,
{
    pub(crate) registry: Arc<TestSessionRegistry>,
    pub(crate) clock: Arc<C>,
    pub(crate) timeout: Duration,
    pub(crate) emit_timeout_event: bool,
}

impl<C> TimeoutGuard<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Schedules cleanup of `session_id` after the timeout elapses.
    ///
    /// The guard stands down as soon as `cancel` fires, which the registry
    /// does whenever the session is cleaned up by any other path.
    pub(crate) fn spawn(self, session_id: TestSessionId, cancel: CancellationToken) {
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(%session_id, "timeout guard cancelled");
                }
                () = tokio::time::sleep(self.timeout) => {
                    self.expire(&session_id);
                }
            }
        });
    }

    fn expire(&self, session_id: &TestSessionId) {
        let last = self.emit_timeout_event.then(|| {
            FanoutItem::Event(LifecycleEvent::timed_out(session_id.clone(), self.clock.utc()))
        });
        if self.registry.finish(session_id, last) {
            warn!(%session_id, timeout_secs = self.timeout.as_secs(), "test session timed out");
        }
    }
}
