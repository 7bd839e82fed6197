//! MCP transport kinds a server under test can be reached through.

use super::ParseTransportKindError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported MCP transport variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum McpTransportKind {
    /// MCP over a local process's STDIO.
    Stdio,
    /// MCP over HTTP+SSE.
    Sse,
    /// MCP over streamable HTTP.
    Stream,
}

impl McpTransportKind {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "STDIO",
            Self::Sse => "SSE",
            Self::Stream => "STREAM",
        }
    }
}

impl fmt::Display for McpTransportKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for McpTransportKind {
    type Error = ParseTransportKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "STDIO" => Ok(Self::Stdio),
            "SSE" => Ok(Self::Sse),
            "STREAM" => Ok(Self::Stream),
            _ => Err(ParseTransportKindError(value.to_owned())),
        }
    }
}
