//! Tool descriptors discovered by a completed test.

use super::ServerTestDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata for a tool reported by an MCP server under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDescriptor {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotations: Option<Value>,
}

impl McpToolDescriptor {
    /// Creates a tool descriptor.
    ///
    /// Unlike registered tool definitions, a descriptor may carry an empty
    /// description: it mirrors whatever the server reported.
    ///
    /// # Errors
    ///
    /// Returns [`ServerTestDomainError::EmptyToolName`] when `name` is empty
    /// after trimming.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Result<Self, ServerTestDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(ServerTestDomainError::EmptyToolName);
        }

        Ok(Self {
            name: normalized_name,
            description: description.into().trim().to_owned(),
            input_schema,
            annotations: None,
        })
    }

    /// Sets tool annotations such as a display title or hints.
    #[must_use]
    pub fn with_annotations(mut self, annotations: Value) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Re-applies constructor validation to a descriptor decoded from the
    /// wire.
    ///
    /// # Errors
    ///
    /// Returns [`ServerTestDomainError::EmptyToolName`] when the decoded name
    /// is blank.
    pub fn validated(self) -> Result<Self, ServerTestDomainError> {
        let annotations = self.annotations;
        let mut descriptor = Self::new(self.name, self.description, self.input_schema)?;
        descriptor.annotations = annotations;
        Ok(descriptor)
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the optional annotations.
    #[must_use]
    pub const fn annotations(&self) -> Option<&Value> {
        self.annotations.as_ref()
    }
}
