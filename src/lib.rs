//! Skilder: control plane for a tool-orchestration platform.
//!
//! This crate provides the MCP server test-session orchestrator: callers
//! request an ad-hoc test of an MCP server configuration, receive a handle
//! at once, and observe multi-stage progress reported by remote workers over
//! a message bus.
//!
//! # Architecture
//!
//! Skilder follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (message bus, data layer)
//!
//! # Modules
//!
//! - [`server_test`]: MCP server test sessions and progress fan-out

pub mod server_test;
