//! # mcpserve-core
//!
//! Core types for the mcpserve MCP server runtime.
//!
//! This crate is the foundation layer shared by the transport and server
//! crates:
//!
//! - **Protocol types**: JSON-RPC 2.0 request/response/notification envelopes
//! - **Protocol versions**: the three supported MCP revisions and their
//!   version-gated response shapes
//! - **Content model**: the tagged content union and its per-version wire
//!   adaptation
//! - **Capability types**: tools, resources, prompts, sampling
//! - **URI templates**: `{param}` and `{param*}` pattern matching with
//!   defaults
//! - **Roots**: canonicalized filesystem prefixes handlers may address
//! - **Error handling**: a unified [`McpError`] with JSON-RPC error mapping
//!
//! The crate is runtime-agnostic; nothing here depends on an async executor.
//!
//! # Example
//!
//! ```rust
//! use mcpserve_core::{
//!     types::{Content, Tool},
//!     version::ProtocolVersion,
//! };
//!
//! let tool = Tool::new("search")
//!     .description("Search the index")
//!     .input_schema(serde_json::json!({
//!         "type": "object",
//!         "properties": { "query": { "type": "string" } },
//!         "required": ["query"]
//!     }));
//! assert_eq!(tool.name, "search");
//!
//! // Content adapts its wire form to the negotiated version.
//! let audio = Content::audio_url("https://cdn.example/clip.mp3", "audio/mpeg");
//! let wire = audio.to_wire(ProtocolVersion::V2024_11_05);
//! assert_eq!(wire["type"], "link"); // audio is coerced on the oldest revision
//! ```

pub mod capability;
pub mod error;
pub mod protocol;
pub mod roots;
pub mod types;
pub mod uri;
pub mod version;

pub use capability::{
    ClientCapabilities, ClientInfo, InitializeResult, SamplingCapability, ServerCapabilities,
    ServerInfo,
};
pub use error::{JsonRpcError, McpError};
pub use protocol::{Message, Notification, ProgressToken, Request, RequestId, Response};
pub use roots::RootSet;
pub use uri::UriTemplate;
pub use version::ProtocolVersion;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use mcpserve_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capability::{
        ClientCapabilities, ClientInfo, InitializeResult, SamplingCapability, ServerCapabilities,
        ServerInfo,
    };
    pub use crate::error::{JsonRpcError, McpError};
    pub use crate::protocol::{Message, Notification, ProgressToken, Request, RequestId, Response};
    pub use crate::roots::RootSet;
    pub use crate::types::{
        CallToolResult, Content, ContentKind, CreateMessageRequest, CreateMessageResult,
        GetPromptResult, MessageTemplate, ModelPreferences, Prompt, PromptArgument, PromptMessage,
        Resource, ResourceOutput, ResourceTemplate, Role, SamplingMessage, StopReason, Tool,
        ToolOutput,
    };
    pub use crate::uri::UriTemplate;
    pub use crate::version::ProtocolVersion;
}

#[cfg(test)]
mod tests {
    #[test]
    fn prelude_imports() {
        use crate::prelude::*;

        let _tool = Tool::new("probe");
        let _caps = ServerCapabilities::new().with_tools().with_resources();
        assert_eq!(ProtocolVersion::DEFAULT, ProtocolVersion::V2025_03_26);
    }
}
