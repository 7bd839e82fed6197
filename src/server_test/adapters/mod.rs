//! Adapter implementations for the server test ports.

pub mod memory;
