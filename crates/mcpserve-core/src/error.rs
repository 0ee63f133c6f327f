//! Unified error handling for the runtime.
//!
//! All fallible paths flow through a single [`McpError`]. Conversion into a
//! wire-level [`JsonRpcError`] is centralized here so that each variant maps
//! to exactly one JSON-RPC code.
//!
//! Two error channels exist and must not be confused:
//!
//! - **Protocol errors** (`Result<T, McpError>`) — malformed envelopes,
//!   unknown methods, invalid parameters, internal failures. These become
//!   JSON-RPC `error` objects.
//! - **Tool failures** — a tool that runs but fails reports in-band through
//!   `CallToolResult { is_error: true }`, never as a JSON-RPC error. The
//!   dispatcher performs that conversion; nothing in this module does.
//!
//! # Example
//!
//! ```rust
//! use mcpserve_core::error::{JsonRpcError, McpError};
//!
//! let err = McpError::invalid_params("tools/call", "missing tool name");
//! let wire: JsonRpcError = (&err).into();
//! assert_eq!(wire.code, -32602);
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// JSON-RPC error codes used by the runtime.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON was not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available server-side.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal server error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Start of the implementation-defined server error range.
    pub const SERVER_ERROR_START: i32 = -32000;
    /// The request was cancelled before completion.
    pub const CANCELLED: i32 = SERVER_ERROR_START - 1;
    /// A transport-level failure.
    pub const TRANSPORT: i32 = SERVER_ERROR_START - 2;
    /// An operation timed out.
    pub const TIMEOUT: i32 = SERVER_ERROR_START - 3;
}

/// The primary error type for the runtime.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum McpError {
    /// Invalid JSON was received.
    #[error("Parse error: {message}")]
    #[diagnostic(
        code(mcp::protocol::parse_error),
        help("Ensure the frame is a valid JSON-RPC 2.0 message")
    )]
    Parse {
        /// Human-readable error message.
        message: String,
        /// The underlying parse error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// The JSON was not a valid request object.
    #[error("Invalid request: {message}")]
    #[diagnostic(code(mcp::protocol::invalid_request))]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
    },

    /// The method does not exist or is client-only.
    #[error("Method not found: {method}")]
    #[diagnostic(code(mcp::protocol::method_not_found))]
    MethodNotFound {
        /// The method that was requested.
        method: String,
    },

    /// Invalid method parameter(s).
    #[error("Invalid params for '{method}': {message}")]
    #[diagnostic(code(mcp::protocol::invalid_params))]
    InvalidParams {
        /// The method that received invalid parameters.
        method: String,
        /// Human-readable error message.
        message: String,
    },

    /// Internal error (handler panic, unexpected registry state).
    #[error("Internal error: {message}")]
    #[diagnostic(code(mcp::protocol::internal_error), severity(error))]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// No tool is registered under the requested name.
    #[error("Tool not found: {name}")]
    #[diagnostic(code(mcp::tool::not_found))]
    ToolNotFound {
        /// The requested tool name.
        name: String,
    },

    /// No resource or template matches the requested URI.
    #[error("Resource not found: {uri}")]
    #[diagnostic(
        code(mcp::resource::not_found),
        help("Verify the URI is correct and the resource is registered")
    )]
    ResourceNotFound {
        /// The requested URI.
        uri: String,
    },

    /// No prompt is registered under the requested name.
    #[error("Prompt not found: {name}")]
    #[diagnostic(code(mcp::prompt::not_found))]
    PromptNotFound {
        /// The requested prompt name.
        name: String,
    },

    /// The request was cancelled before the handler finished.
    #[error("Operation cancelled: {operation}")]
    #[diagnostic(code(mcp::cancelled))]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
        /// Reason supplied by the cancelling peer, if any.
        reason: Option<String>,
    },

    /// A sampling request was rejected by the controller.
    #[error("Sampling rejected ({kind}): {message}")]
    #[diagnostic(code(mcp::sampling::rejected))]
    SamplingRejected {
        /// Which constraint rejected the request.
        kind: SamplingRejection,
        /// Human-readable error message.
        message: String,
        /// A degradation suggestion, when graceful degradation could apply.
        suggestion: Option<String>,
    },

    /// A capability the peer did not declare was required.
    #[error("Capability not supported: {capability}")]
    #[diagnostic(code(mcp::capability::not_supported))]
    CapabilityNotSupported {
        /// The missing capability.
        capability: String,
    },

    /// Transport-level failure.
    #[error("Transport error: {message}")]
    #[diagnostic(code(mcp::transport::error))]
    Transport {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// An operation timed out.
    #[error("Timeout after {duration:?}: {operation}")]
    #[diagnostic(
        code(mcp::timeout),
        help("Consider raising the timeout or checking connectivity")
    )]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long we waited before giving up.
        duration: std::time::Duration,
    },
}

/// The constraint that rejected a sampling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingRejection {
    /// The per-session requests-per-minute window is exhausted.
    RateLimited,
    /// Too many sampling requests are already in flight for the session.
    ConcurrencyExceeded,
    /// The request asked for more tokens than the version's ceiling.
    TokenBudget,
    /// A message carries a content kind the negotiated version forbids.
    UnsupportedContent,
    /// The priority value was outside 1..=10.
    InvalidPriority,
}

impl std::fmt::Display for SamplingRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RateLimited => "rate limited",
            Self::ConcurrencyExceeded => "concurrency exceeded",
            Self::TokenBudget => "token budget",
            Self::UnsupportedContent => "unsupported content",
            Self::InvalidPriority => "invalid priority",
        };
        f.write_str(s)
    }
}

impl McpError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a parse error with a source.
    pub fn parse_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Parse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a method not found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid params error.
    pub fn invalid_params(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with a source.
    pub fn internal_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a tool-not-found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a resource-not-found error.
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::ResourceNotFound { uri: uri.into() }
    }

    /// Create a prompt-not-found error.
    pub fn prompt_not_found(name: impl Into<String>) -> Self {
        Self::PromptNotFound { name: name.into() }
    }

    /// Create a cancellation error.
    pub fn cancelled(operation: impl Into<String>, reason: Option<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            reason,
        }
    }

    /// Create a sampling rejection.
    pub fn sampling_rejected(kind: SamplingRejection, message: impl Into<String>) -> Self {
        Self::SamplingRejected {
            kind,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create a sampling rejection with a degradation suggestion.
    pub fn sampling_rejected_with_suggestion(
        kind: SamplingRejection,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::SamplingRejected {
            kind,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a capability-not-supported error.
    pub fn capability_not_supported(capability: impl Into<String>) -> Self {
        Self::CapabilityNotSupported {
            capability: capability.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error with a source.
    pub fn transport_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// The JSON-RPC error code for this error.
    ///
    /// Unknown tool/resource/prompt names are invalid-params conditions at
    /// the wire, as are sampling constraint rejections.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse { .. } => codes::PARSE_ERROR,
            Self::InvalidRequest { .. } => codes::INVALID_REQUEST,
            Self::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            Self::InvalidParams { .. }
            | Self::ToolNotFound { .. }
            | Self::ResourceNotFound { .. }
            | Self::PromptNotFound { .. }
            | Self::SamplingRejected { .. }
            | Self::CapabilityNotSupported { .. } => codes::INVALID_PARAMS,
            Self::Internal { .. } => codes::INTERNAL_ERROR,
            Self::Cancelled { .. } => codes::CANCELLED,
            Self::Transport { .. } => codes::TRANSPORT,
            Self::Timeout { .. } => codes::TIMEOUT,
        }
    }

    /// Whether this error is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse_with_source("invalid JSON", err)
    }
}

// ============================================================================
// JSON-RPC Error Response Type
// ============================================================================

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Create an error with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a "parse error" (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, message)
    }

    /// Create an "invalid request" error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    /// Create a "method not found" error (-32601).
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, message)
    }

    /// Create an "invalid params" error (-32602).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    /// Create an "internal error" (-32603).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }
}

impl From<&McpError> for JsonRpcError {
    fn from(err: &McpError) -> Self {
        let data = match err {
            McpError::MethodNotFound { method } => Some(serde_json::json!({ "method": method })),
            McpError::InvalidParams { method, .. } => Some(serde_json::json!({ "method": method })),
            McpError::SamplingRejected {
                kind, suggestion, ..
            } => Some(serde_json::json!({ "kind": kind, "suggestion": suggestion })),
            McpError::Cancelled { reason, .. } => Some(serde_json::json!({ "reason": reason })),
            _ => None,
        };
        Self {
            code: err.code(),
            message: err.to_string(),
            data,
        }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        (&err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping() {
        assert_eq!(McpError::parse("x").code(), -32700);
        assert_eq!(McpError::invalid_request("x").code(), -32600);
        assert_eq!(McpError::method_not_found("roots/list").code(), -32601);
        assert_eq!(McpError::invalid_params("m", "x").code(), -32602);
        assert_eq!(McpError::internal("x").code(), -32603);
        assert_eq!(McpError::tool_not_found("calc").code(), -32602);
        assert_eq!(McpError::resource_not_found("/x").code(), -32602);
        assert_eq!(McpError::prompt_not_found("p").code(), -32602);
        assert_eq!(
            McpError::sampling_rejected(SamplingRejection::TokenBudget, "over").code(),
            -32602
        );
    }

    #[test]
    fn wire_conversion_carries_data() {
        let err = McpError::sampling_rejected_with_suggestion(
            SamplingRejection::TokenBudget,
            "requested 5000 tokens, ceiling is 4096",
            "retry with maxTokens <= 4096",
        );
        let wire: JsonRpcError = (&err).into();
        assert_eq!(wire.code, codes::INVALID_PARAMS);
        let data = wire.data.unwrap();
        assert_eq!(data["kind"], "token_budget");
        assert!(data["suggestion"].as_str().unwrap().contains("4096"));
    }

    #[test]
    fn cancellation_is_detectable() {
        let err = McpError::cancelled("tools/call slow", Some("client gave up".into()));
        assert!(err.is_cancelled());
        assert!(!McpError::internal("x").is_cancelled());
    }

    #[test]
    fn serde_json_errors_become_parse_errors() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: McpError = parse_err.into();
        assert_eq!(err.code(), codes::PARSE_ERROR);
    }
}
