//! Port contracts for MCP server test orchestration.

mod bus;
mod workspace;
pub mod wire;

pub use bus::{
    BusError, BusResult, LifecycleMessages, LifecycleSubscription, SubscriptionDrain,
    TestSessionBus,
};
#[cfg(test)]
pub use workspace::MockWorkspaceDirectory;
pub use workspace::{WorkspaceDirectory, WorkspaceDirectoryError, WorkspaceDirectoryResult};
