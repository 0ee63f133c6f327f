//! JSON-RPC 2.0 envelope types.
//!
//! Every frame entering or leaving the runtime is one of three message
//! kinds:
//!
//! - **Request**: a method call expecting exactly one response
//! - **Response**: the reply to a request (result or error, never both)
//! - **Notification**: a one-way message with no id and no reply
//!
//! [`Message::decode`] is the single entry point from raw frame bytes: it
//! classifies malformed JSON (`-32700`) separately from well-formed JSON
//! that is not a valid envelope (`-32600`), and recovers the request id from
//! bad envelopes where possible so the dispatcher can still address its
//! error response.
//!
//! # Example
//!
//! ```rust
//! use mcpserve_core::protocol::Message;
//!
//! let frame = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
//! let message = Message::decode(frame).unwrap();
//! assert_eq!(message.method(), Some("ping"));
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{JsonRpcError, McpError};

/// The JSON-RPC version string. Always "2.0".
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request id, used to correlate requests with responses.
///
/// Ids may be numbers or strings per the JSON-RPC 2.0 specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request id (most common).
    Number(u64),
    /// String request id.
    String(String),
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A progress token attached to a long-running request.
///
/// Clients pass the token in `params._meta.progressToken`; the server echoes
/// it in `notifications/progress`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    /// Numeric progress token.
    Number(u64),
    /// String progress token.
    String(String),
}

impl std::fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The request id for correlation.
    pub id: RequestId,
    /// The method to invoke.
    pub method: Cow<'static, str>,
    /// The method parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Create a new request with no parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Create a new request with parameters.
    #[must_use]
    pub fn with_params(
        method: impl Into<Cow<'static, str>>,
        id: impl Into<RequestId>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Extract the progress token from `params._meta.progressToken`, if one
    /// was supplied.
    #[must_use]
    pub fn progress_token(&self) -> Option<ProgressToken> {
        self.params
            .as_ref()?
            .get("_meta")?
            .get("progressToken")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// A JSON-RPC 2.0 response message.
///
/// A response carries either a result or an error, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The request id this response answers.
    pub id: RequestId,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Response {
    /// Create a successful response.
    #[must_use]
    pub fn success(id: impl Into<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(id: impl Into<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Check if this response indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    /// Get the result, consuming self.
    ///
    /// Returns `Err` if this was an error response.
    pub fn into_result(self) -> Result<serde_json::Value, JsonRpcError> {
        if let Some(error) = self.error {
            Err(error)
        } else {
            self.result
                .ok_or_else(|| JsonRpcError::internal_error("response carried neither result nor error"))
        }
    }
}

/// A JSON-RPC 2.0 notification message.
///
/// Notifications have no id and receive no reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The notification method.
    pub method: Cow<'static, str>,
    /// The notification parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    /// Create a new notification with no parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params: None,
        }
    }

    /// Create a new notification with parameters.
    #[must_use]
    pub fn with_params(method: impl Into<Cow<'static, str>>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params: Some(params),
        }
    }
}

/// A JSON-RPC 2.0 message of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A request message.
    Request(Request),
    /// A response message.
    Response(Response),
    /// A notification message.
    Notification(Notification),
}

impl Message {
    /// Decode a raw frame into a message.
    ///
    /// Malformed JSON yields a parse error; well-formed JSON that is not a
    /// valid envelope (wrong `jsonrpc` field, missing `method`, ...) yields
    /// an invalid-request error. In the latter case the request id is
    /// recovered when the frame carried one, so the caller can still address
    /// its error response.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| EnvelopeError {
            error: McpError::parse_with_source("frame is not valid JSON", e),
            id: None,
        })?;

        let id = recover_id(&value);

        if value.get("jsonrpc").and_then(serde_json::Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(EnvelopeError {
                error: McpError::invalid_request("missing or unsupported jsonrpc version"),
                id,
            });
        }

        serde_json::from_value(value).map_err(|e| EnvelopeError {
            error: McpError::invalid_request(format!("not a valid JSON-RPC envelope: {e}")),
            id,
        })
    }

    /// Encode this message as a single frame.
    pub fn encode(&self) -> Result<Vec<u8>, McpError> {
        serde_json::to_vec(self)
            .map_err(|e| McpError::internal_with_source("failed to encode frame", e))
    }

    /// Get the method name if this is a request or notification.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }

    /// Get the request id if this is a request or response.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => Some(&r.id),
            Self::Notification(_) => None,
        }
    }
}

impl From<Request> for Message {
    fn from(r: Request) -> Self {
        Self::Request(r)
    }
}

impl From<Response> for Message {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

impl From<Notification> for Message {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}

/// A failed envelope decode, with the request id recovered where possible.
#[derive(Debug)]
pub struct EnvelopeError {
    /// Why the frame could not be decoded.
    pub error: McpError,
    /// The id found in the frame, if one was recoverable.
    pub id: Option<RequestId>,
}

/// Pull a request id out of an arbitrary JSON value.
fn recover_id(value: &serde_json::Value) -> Option<RequestId> {
    match value.get("id")? {
        serde_json::Value::Number(n) => n.as_u64().map(RequestId::Number),
        serde_json::Value::String(s) => Some(RequestId::String(s.clone())),
        _ => None,
    }
}
