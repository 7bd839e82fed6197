//! Lifecycle events relayed from the remote test worker to observers.

use super::{McpToolDescriptor, TestSessionId, TestStage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured failure reported by the remote worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    /// Machine-readable failure code, e.g. `SERVER_START_FAILED`.
    pub code: String,
    /// Human-readable failure message.
    pub message: String,
    /// Optional free-form diagnostic payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl TestFailure {
    /// Creates a failure without details.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attaches a diagnostic payload.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// One stage transition of a test session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    session_id: TestSessionId,
    server_id: Option<String>,
    stage: TestStage,
    message: String,
    timestamp: DateTime<Utc>,
    tools: Option<Vec<McpToolDescriptor>>,
    error: Option<TestFailure>,
}

impl LifecycleEvent {
    /// Creates an event carrying neither tools nor an error.
    #[must_use]
    pub fn new(
        session_id: TestSessionId,
        stage: TestStage,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            server_id: None,
            stage,
            message: message.into(),
            timestamp,
            tools: None,
            error: None,
        }
    }

    /// Creates the synthetic event emitted when a session times out.
    #[must_use]
    pub fn timed_out(session_id: TestSessionId, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            session_id,
            TestStage::TimedOut,
            "Test session timed out waiting for the worker",
            timestamp,
        )
    }

    /// Records the identifier the worker assigned to the server under test.
    #[must_use]
    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// Attaches discovered tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<McpToolDescriptor>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Attaches a structured failure.
    #[must_use]
    pub fn with_error(mut self, error: TestFailure) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns the owning session.
    #[must_use]
    pub const fn session_id(&self) -> &TestSessionId {
        &self.session_id
    }

    /// Returns the worker-side server identifier, if reported.
    #[must_use]
    pub fn server_id(&self) -> Option<&str> {
        self.server_id.as_deref()
    }

    /// Returns the stage this event reports.
    #[must_use]
    pub const fn stage(&self) -> TestStage {
        self.stage
    }

    /// Returns the human-readable progress message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns when the worker produced the event.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns discovered tools, present on completion.
    #[must_use]
    pub fn tools(&self) -> Option<&[McpToolDescriptor]> {
        self.tools.as_deref()
    }

    /// Returns the failure, present on `FAILED`.
    #[must_use]
    pub const fn error(&self) -> Option<&TestFailure> {
        self.error.as_ref()
    }

    /// Returns whether this event ends the session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}
