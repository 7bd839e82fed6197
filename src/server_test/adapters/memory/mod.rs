//! In-memory adapters for the server test ports.

mod bus;
mod workspace;

pub use bus::InMemoryTestSessionBus;
pub use workspace::InMemoryWorkspaceDirectory;
