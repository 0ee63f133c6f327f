//! Tool types.
//!
//! Tools are named, schema-typed, remotely callable functions. A tool's
//! input schema is a JSON Schema object, either supplied explicitly at
//! registration or derived from the handler's argument type.

use serde::{Deserialize, Serialize};

use super::content::Content;

/// A tool definition as it appears in `tools/list`.
///
/// # Example
///
/// ```rust
/// use mcpserve_core::types::Tool;
///
/// let tool = Tool::new("search")
///     .description("Search the index")
///     .input_schema(serde_json::json!({
///         "type": "object",
///         "properties": { "query": { "type": "string" } },
///         "required": ["query"]
///     }));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Unique name of the tool.
    pub name: String,
    /// Human-readable description of what the tool does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema object describing the tool's input.
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
    /// Free-form annotations exposed alongside the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Tool {
    /// Create a new tool with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            annotations: None,
        }
    }

    /// Set the tool's description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tool's input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Attach an annotation key/value pair.
    #[must_use]
    pub fn annotation(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.annotations
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

/// The result of `tools/call`.
///
/// `is_error` is always present on the wire; tool failures are reported
/// in-band here rather than as JSON-RPC errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    /// The content items produced by the tool.
    pub content: Vec<Content>,
    /// Whether this result represents a failure.
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    /// Create a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// Create a successful result with the given content items.
    #[must_use]
    pub const fn content(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Create an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }
}

/// Handler-facing tool output.
///
/// Handlers return this richer type; the dispatcher lowers it into a
/// [`CallToolResult`].
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// Successful output with explicit content items.
    Content(Vec<Content>),
    /// Successful output carrying a structured payload; the dispatcher
    /// serializes it as pretty JSON text.
    Structured(serde_json::Value),
    /// A failure the model can see and correct.
    Error {
        /// The error message.
        message: String,
    },
}

impl ToolOutput {
    /// Create a single-item text output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Content(vec![Content::text(text)])
    }

    /// Create an output with multiple content items.
    #[must_use]
    pub const fn content(content: Vec<Content>) -> Self {
        Self::Content(content)
    }

    /// Create a structured output from any serializable value.
    pub fn structured<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Structured(serde_json::to_value(value)?))
    }

    /// Create an error output.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<ToolOutput> for CallToolResult {
    fn from(output: ToolOutput) -> Self {
        match output {
            ToolOutput::Content(content) => Self::content(content),
            ToolOutput::Structured(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                Self::text(text)
            }
            ToolOutput::Error { message } => Self::error(message),
        }
    }
}
