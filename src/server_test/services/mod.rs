//! Application services for MCP server test sessions.

mod config;
mod context;
mod fanout;
mod orchestrator;
mod registry;
mod router;
mod timeout;

pub use config::{DEFAULT_TEST_SESSION_TIMEOUT, TestSessionConfig};
pub use context::{ExecutionContext, ExecutionContextResolver};
pub use fanout::{FanoutItem, SessionFanout, TestProgressError, TestProgressStream};
pub use orchestrator::McpServerTestOrchestrator;
pub use registry::{SessionLease, TestSessionRegistry};
