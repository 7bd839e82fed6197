//! Stages a test session passes through.

use super::ParseTestStageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress stage of an MCP server test session.
///
/// Stages are totally ordered by [`TestStage::rank`]. The three terminal
/// stages share the highest rank so that a session can reach at most one of
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStage {
    /// Allocated locally, request not yet published.
    Pending,
    /// The remote worker accepted the request.
    Starting,
    /// The remote worker is fetching the server package.
    Installing,
    /// The remote worker is opening the MCP transport.
    Connecting,
    /// The remote worker is querying the server's tool catalog.
    ListingTools,
    /// The test finished and tools were discovered.
    Completed,
    /// The remote worker reported a failure.
    Failed,
    /// No terminal stage arrived within the session timeout.
    TimedOut,
}

impl TestStage {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Starting => "STARTING",
            Self::Installing => "INSTALLING",
            Self::Connecting => "CONNECTING",
            Self::ListingTools => "LISTING_TOOLS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
        }
    }

    /// Position of the stage in the session's total order.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Starting => 1,
            Self::Installing => 2,
            Self::Connecting => 3,
            Self::ListingTools => 4,
            Self::Completed | Self::Failed | Self::TimedOut => 5,
        }
    }

    /// Returns whether no further events are expected after this stage.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    /// Returns whether a session currently at `self` may report `next`.
    ///
    /// Repeating a non-terminal stage is allowed (workers send several
    /// progress messages per stage); nothing follows a terminal stage.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl fmt::Display for TestStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TestStage {
    type Error = ParseTestStageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "PENDING" => Ok(Self::Pending),
            "STARTING" => Ok(Self::Starting),
            "INSTALLING" => Ok(Self::Installing),
            "CONNECTING" => Ok(Self::Connecting),
            "LISTING_TOOLS" => Ok(Self::ListingTools),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "TIMED_OUT" => Ok(Self::TimedOut),
            _ => Err(ParseTestStageError(value.to_owned())),
        }
    }
}
