//! Test request parameters and the handle returned to callers.

use super::{
    McpToolDescriptor, McpTransportKind, RuntimeId, TestFailure, TestSessionId, TestStage,
    WorkspaceId,
};
use serde::{Deserialize, Serialize};

/// Configuration of the MCP server a caller wants to try out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerTestParams {
    name: String,
    repository_url: String,
    transport: McpTransportKind,
    config: String,
    workspace_id: WorkspaceId,
}

impl McpServerTestParams {
    /// Creates test parameters.
    ///
    /// Nothing is validated at this layer. `config` is the server's JSON
    /// configuration document and is forwarded verbatim; a blank name or
    /// malformed configuration surfaces later as a `FAILED` event from the
    /// worker.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        repository_url: impl Into<String>,
        transport: McpTransportKind,
        config: impl Into<String>,
        workspace_id: WorkspaceId,
    ) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            repository_url: repository_url.into().trim().to_owned(),
            transport,
            config: config.into(),
            workspace_id,
        }
    }

    /// Returns the server name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source repository URL.
    #[must_use]
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// Returns the transport kind.
    #[must_use]
    pub const fn transport(&self) -> McpTransportKind {
        self.transport
    }

    /// Returns the raw configuration document.
    #[must_use]
    pub fn config(&self) -> &str {
        &self.config
    }

    /// Returns the workspace the test runs on behalf of.
    #[must_use]
    pub const fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }
}

/// Outbound "start test" message published to the worker fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerTestRequest {
    session_id: TestSessionId,
    #[serde(flatten)]
    params: McpServerTestParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    runtime_id: Option<RuntimeId>,
}

impl McpServerTestRequest {
    /// Creates a request for `session_id`.
    #[must_use]
    pub const fn new(session_id: TestSessionId, params: McpServerTestParams) -> Self {
        Self {
            session_id,
            params,
            runtime_id: None,
        }
    }

    /// Addresses the request to a specific execution runtime.
    #[must_use]
    pub fn with_runtime(mut self, runtime_id: Option<RuntimeId>) -> Self {
        self.runtime_id = runtime_id;
        self
    }

    /// Returns the correlation identifier.
    #[must_use]
    pub const fn session_id(&self) -> &TestSessionId {
        &self.session_id
    }

    /// Returns the server parameters.
    #[must_use]
    pub const fn params(&self) -> &McpServerTestParams {
        &self.params
    }

    /// Returns the designated runtime, if one was resolved.
    #[must_use]
    pub const fn runtime_id(&self) -> Option<&RuntimeId> {
        self.runtime_id.as_ref()
    }
}

/// Immediate result of starting a test.
///
/// Mirrors the shape of a [`super::LifecycleEvent`] so API layers can render
/// the handle and later progress uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSessionHandle {
    /// Correlation identifier used to observe progress.
    pub session_id: TestSessionId,
    /// Always [`TestStage::Pending`] on return from `start_test`.
    pub stage: TestStage,
    /// Always empty on return from `start_test`.
    pub tools: Option<Vec<McpToolDescriptor>>,
    /// Always empty on return from `start_test`.
    pub error: Option<TestFailure>,
}

impl TestSessionHandle {
    /// Creates the pending handle for a freshly allocated session.
    #[must_use]
    pub const fn pending(session_id: TestSessionId) -> Self {
        Self {
            session_id,
            stage: TestStage::Pending,
            tools: None,
            error: None,
        }
    }
}
