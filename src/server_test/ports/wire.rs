//! JSON message contract shared with the remote test workers.
//!
//! Requests go out on [`REQUEST_SUBJECT`]; lifecycle events come back on a
//! per-session subject built by [`lifecycle_subject`]. Field names are
//! camelCase on the wire.

use crate::server_test::domain::{
    LifecycleEvent, McpServerTestRequest, McpToolDescriptor, ParseTestStageError, TestFailure,
    TestSessionId, TestStage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Subject start-test requests are published on.
pub const REQUEST_SUBJECT: &str = "mcp.server.test.request";

/// Returns the subject lifecycle events for `session_id` are published on.
#[must_use]
pub fn lifecycle_subject(session_id: &TestSessionId) -> String {
    format!("mcp.server.test.{session_id}.lifecycle")
}

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// The payload is not valid JSON for the expected shape.
    #[error("malformed wire message: {0}")]
    Json(#[from] serde_json::Error),

    /// The stage field names no known stage.
    #[error(transparent)]
    UnknownStage(#[from] ParseTestStageError),

    /// The worker reported a stage only the orchestrator may assign.
    #[error("stage {0} is assigned locally and cannot come from a worker")]
    ReservedStage(TestStage),

    /// A millisecond timestamp was out of range.
    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    /// The message belongs to a different session than the subscription.
    #[error("message for session {actual} arrived on subscription for {expected}")]
    SessionMismatch {
        /// Session the subscription is scoped to.
        expected: TestSessionId,
        /// Session named in the payload.
        actual: String,
    },
}

/// Workers emit either RFC 3339 strings or epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Rfc3339(DateTime<Utc>),
    EpochMillis(i64),
}

impl WireTimestamp {
    fn into_utc(self) -> Result<DateTime<Utc>, WireError> {
        match self {
            Self::Rfc3339(value) => Ok(value),
            Self::EpochMillis(millis) => {
                DateTime::from_timestamp_millis(millis).ok_or(WireError::InvalidTimestamp(millis))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleWireMessage {
    session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_id: Option<String>,
    stage: String,
    #[serde(default)]
    message: String,
    timestamp: WireTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<McpToolDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<TestFailure>,
}

/// Encodes a start-test request.
///
/// # Errors
///
/// Returns [`WireError::Json`] when serialization fails.
pub fn encode_request(request: &McpServerTestRequest) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(request)?)
}

/// Decodes a start-test request, as a worker would.
///
/// # Errors
///
/// Returns [`WireError::Json`] when the payload does not match the request
/// shape.
pub fn decode_request(payload: &[u8]) -> Result<McpServerTestRequest, WireError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Encodes a lifecycle event in the worker's wire format.
///
/// # Errors
///
/// Returns [`WireError::Json`] when serialization fails.
pub fn encode_lifecycle_event(event: &LifecycleEvent) -> Result<Vec<u8>, WireError> {
    let message = LifecycleWireMessage {
        session_id: event.session_id().as_str().to_owned(),
        server_id: event.server_id().map(str::to_owned),
        stage: event.stage().as_str().to_owned(),
        message: event.message().to_owned(),
        timestamp: WireTimestamp::Rfc3339(event.timestamp()),
        tools: event.tools().map(<[McpToolDescriptor]>::to_vec),
        error: event.error().cloned(),
    };
    Ok(serde_json::to_vec(&message)?)
}

/// Decodes a lifecycle payload received on `expected`'s subscription.
///
/// # Errors
///
/// Returns [`WireError`] when the payload is malformed, names an unknown or
/// locally reserved stage, or belongs to another session. Tool descriptors
/// without a name are dropped from the event rather than failing it.
pub fn decode_lifecycle_event(
    expected: &TestSessionId,
    payload: &[u8],
) -> Result<LifecycleEvent, WireError> {
    let wire: LifecycleWireMessage = serde_json::from_slice(payload)?;
    if wire.session_id.trim() != expected.as_str() {
        return Err(WireError::SessionMismatch {
            expected: expected.clone(),
            actual: wire.session_id,
        });
    }

    let stage = TestStage::try_from(wire.stage.as_str())?;
    if stage == TestStage::TimedOut {
        return Err(WireError::ReservedStage(stage));
    }
    let timestamp = wire.timestamp.into_utc()?;
    let mut event = LifecycleEvent::new(expected.clone(), stage, wire.message, timestamp);

    if let Some(server_id) = wire.server_id {
        event = event.with_server_id(server_id);
    }
    if let Some(tools) = wire.tools {
        let validated = tools
            .into_iter()
            .filter_map(|tool| match tool.validated() {
                Ok(valid) => Some(valid),
                Err(err) => {
                    warn!(
                        session_id = %expected,
                        error = %err,
                        "dropping invalid tool descriptor"
                    );
                    None
                }
            })
            .collect();
        event = event.with_tools(validated);
    }
    if let Some(error) = wire.error {
        event = event.with_error(error);
    }
    Ok(event)
}
