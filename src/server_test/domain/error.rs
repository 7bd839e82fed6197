//! Error types for MCP server test domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing server test domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServerTestDomainError {
    /// A session identifier is empty after trimming.
    #[error("test session identifier must not be empty")]
    EmptySessionId,

    /// A tool descriptor name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,
}

/// Error returned while parsing a test stage from the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown MCP server test stage: {0}")]
pub struct ParseTestStageError(pub String);

/// Error returned while parsing a transport kind from the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown MCP transport kind: {0}")]
pub struct ParseTransportKindError(pub String);
