//! Domain model for MCP server test sessions.
//!
//! Sessions are transient: nothing here is persisted. The types describe the
//! request a caller makes, the stages a remote worker reports, and the
//! events relayed to observers. Infrastructure concerns remain outside this
//! boundary.

mod error;
mod event;
mod ids;
mod request;
mod stage;
mod tool;
mod transport;

pub use error::{ParseTestStageError, ParseTransportKindError, ServerTestDomainError};
pub use event::{LifecycleEvent, TestFailure};
pub use ids::{RuntimeId, TestSessionId, ToolId, WorkspaceId};
pub use request::{McpServerTestParams, McpServerTestRequest, TestSessionHandle};
pub use stage::TestStage;
pub use tool::McpToolDescriptor;
pub use transport::McpTransportKind;
