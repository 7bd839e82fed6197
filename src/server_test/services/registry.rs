//! Registry of live test sessions and their resources.

use super::TestSessionConfig;
use super::fanout::{FanoutItem, SessionFanout};
use crate::server_test::domain::TestSessionId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Resources owned by one live session.
///
/// The timeout guard and the session task each watch one cancellation
/// token; cancelling the task's token makes it drain its bus subscription.
#[derive(Debug)]
struct RegistryEntry {
    fanout: Arc<SessionFanout>,
    timeout: CancellationToken,
    subscription: CancellationToken,
}

/// Handles given to the tasks driving a freshly allocated session.
#[derive(Debug, Clone)]
pub struct SessionLease {
    /// Fanout observers attach to.
    pub fanout: Arc<SessionFanout>,
    /// Cancelled when the timeout guard must stand down.
    pub timeout: CancellationToken,
    /// Cancelled when the session task must drain and exit.
    pub subscription: CancellationToken,
}

/// In-memory map from session id to live resources.
///
/// Every mutation goes through one mutex and teardown is a
/// remove-and-check-existed, so when the timeout guard and the event router
/// race to clean up the same session exactly one of them acts.
#[derive(Debug)]
pub struct TestSessionRegistry {
    sessions: Mutex<HashMap<TestSessionId, RegistryEntry>>,
    fanout_capacity: usize,
    replay_capacity: usize,
}

impl TestSessionRegistry {
    /// Creates an empty registry sized by `config`.
    #[must_use]
    pub fn new(config: &TestSessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            fanout_capacity: config.fanout_capacity,
            replay_capacity: config.replay_capacity,
        }
    }

    // Entries are inserted and removed whole, so a poisoned map is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<TestSessionId, RegistryEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates the resources for a new session.
    ///
    /// Returns `None` when `session_id` is already live; at most one entry
    /// exists per session.
    #[must_use]
    pub fn allocate(&self, session_id: &TestSessionId) -> Option<SessionLease> {
        let mut sessions = self.lock();
        let Entry::Vacant(slot) = sessions.entry(session_id.clone()) else {
            return None;
        };

        let entry = RegistryEntry {
            fanout: Arc::new(SessionFanout::new(
                self.fanout_capacity,
                self.replay_capacity,
            )),
            timeout: CancellationToken::new(),
            subscription: CancellationToken::new(),
        };
        let lease = SessionLease {
            fanout: Arc::clone(&entry.fanout),
            timeout: entry.timeout.clone(),
            subscription: entry.subscription.clone(),
        };
        slot.insert(entry);
        debug!(%session_id, "allocated test session");
        Some(lease)
    }

    /// Returns the live fanout for `session_id`, without side effects.
    #[must_use]
    pub fn get(&self, session_id: &TestSessionId) -> Option<Arc<SessionFanout>> {
        self.lock()
            .get(session_id)
            .map(|entry| Arc::clone(&entry.fanout))
    }

    /// Returns the live fanout for `session_id`, or a fresh closed one.
    ///
    /// An unknown session is either already cleaned up or never existed;
    /// both get a valid stream that ends immediately. The fresh fanout is not
    /// registered, since an entry without a timeout guard could never be
    /// freed.
    #[must_use]
    pub fn get_or_create(&self, session_id: &TestSessionId) -> Arc<SessionFanout> {
        self.get(session_id).unwrap_or_else(|| {
            debug!(%session_id, "observer attached to unknown test session");
            Arc::new(SessionFanout::closed())
        })
    }

    /// Publishes to a live session's observers.
    ///
    /// Returns `false` when the session is no longer registered.
    #[must_use]
    pub fn publish(&self, session_id: &TestSessionId, item: FanoutItem) -> bool {
        self.get(session_id).is_some_and(|fanout| {
            let observers = fanout.publish(item);
            debug!(%session_id, observers, "published test session progress");
            true
        })
    }

    /// Tears a session down. Idempotent.
    ///
    /// Returns `true` only for the call that actually removed the session.
    #[must_use]
    pub fn cleanup(&self, session_id: &TestSessionId) -> bool {
        self.finish(session_id, None)
    }

    /// Tears a session down after delivering `last` to its observers.
    ///
    /// `last` is discarded when another caller already cleaned the session
    /// up, which keeps terminal events to at most one per session.
    #[must_use]
    pub fn finish(&self, session_id: &TestSessionId, last: Option<FanoutItem>) -> bool {
        let Some(entry) = self.lock().remove(session_id) else {
            debug!(%session_id, "test session already cleaned up");
            return false;
        };

        entry.timeout.cancel();
        let stream_was_open = entry.fanout.finish(last);
        entry.subscription.cancel();
        info!(%session_id, stream_was_open, "cleaned up test session");
        true
    }

    /// Returns whether `session_id` is live.
    #[must_use]
    pub fn contains(&self, session_id: &TestSessionId) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
