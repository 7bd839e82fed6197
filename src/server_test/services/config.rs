//! Tunables for test-session orchestration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default window a session may stay open without a terminal event.
pub const DEFAULT_TEST_SESSION_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_FANOUT_CAPACITY: usize = 64;
const DEFAULT_REPLAY_CAPACITY: usize = 32;

/// Configuration injected into the test orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSessionConfig {
    /// Maximum session lifetime before forced cleanup.
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    /// Per-observer buffer of undelivered events before the observer lags.
    pub fanout_capacity: usize,
    /// Number of already-delivered events replayed to late observers.
    pub replay_capacity: usize,
    /// Whether a synthetic `TIMED_OUT` event precedes timeout cleanup.
    pub emit_timeout_event: bool,
}

impl Default for TestSessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TEST_SESSION_TIMEOUT,
            fanout_capacity: DEFAULT_FANOUT_CAPACITY,
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
            emit_timeout_event: true,
        }
    }
}

impl TestSessionConfig {
    /// Overrides the session timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the per-observer buffer size. Zero is raised to one.
    #[must_use]
    pub const fn with_fanout_capacity(mut self, capacity: usize) -> Self {
        self.fanout_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Overrides the late-observer replay depth.
    #[must_use]
    pub const fn with_replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    /// Enables or disables the synthetic timeout event.
    #[must_use]
    pub const fn with_timeout_event(mut self, emit: bool) -> Self {
        self.emit_timeout_event = emit;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
