//! Identifier types for test sessions and the graph entities they reference.

use super::ServerTestDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation identifier for one MCP server test session.
///
/// The value is opaque to everything except the message bus, which scopes
/// lifecycle subscriptions by it.
///
/// # Examples
///
/// ```
/// use skilder::server_test::domain::TestSessionId;
///
/// let first = TestSessionId::new();
/// let second = TestSessionId::new();
/// assert_ne!(first, second);
/// assert!(!first.as_str().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestSessionId(String);

impl TestSessionId {
    /// Generates a new globally unique session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier received from a caller or the bus.
    ///
    /// # Errors
    ///
    /// Returns [`ServerTestDomainError::EmptySessionId`] when the value is
    /// empty after trimming.
    pub fn parse(value: impl Into<String>) -> Result<Self, ServerTestDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ServerTestDomainError::EmptySessionId);
        }
        Ok(Self(normalized))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Note: like the other generated identifiers, `Default` produces a fresh
/// random value on each call.
impl Default for TestSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<str> for TestSessionId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TestSessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of a workspace stored in the graph database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Creates a workspace identifier.
    ///
    /// The value is not checked here; an unknown workspace is the worker's
    /// to report.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_owned())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of an MCP tool stored in the graph database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    /// Creates a tool identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of the execution runtime designated to run a workspace's tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeId(String);

impl RuntimeId {
    /// Creates a runtime identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
