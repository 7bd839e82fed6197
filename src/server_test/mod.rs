//! MCP server test-session orchestration.
//!
//! A caller asks to try out an MCP server configuration and immediately gets
//! a session handle. A remote worker performs the test and reports progress
//! over the message bus; this module relays that progress to any number of
//! observers and guarantees each session's resources are released exactly
//! once, whether the session completes, fails, times out or is never
//! observed. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
