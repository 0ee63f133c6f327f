//! # mcpserve
//!
//! A Model Context Protocol (MCP) server runtime for Rust: a
//! transport-agnostic, version-aware JSON-RPC 2.0 dispatcher exposing
//! tools, resources, and prompts to remote clients.
//!
//! This facade crate re-exports the three layers:
//!
//! - [`core`](mcpserve_core) — protocol types, versions, content model,
//!   URI templates, roots, errors
//! - [`transport`](mcpserve_transport) — framed byte-stream transports
//!   (stdio, TCP, Unix sockets, in-memory)
//! - [`server`](mcpserve_server) — sessions, registries, cancellation,
//!   sampling, subscriptions, the dispatcher, and the server facade
//!
//! # Quick start
//!
//! ```rust,no_run
//! use mcpserve::prelude::*;
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct SearchArgs {
//!     query: String,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), McpError> {
//! let server = McpServer::builder("search-server", "1.0.0")
//!     .typed_tool("search", "Search the index", |_ctx, args: SearchArgs| async move {
//!         Ok(ToolOutput::text(format!("results for {}", args.query)))
//!     })
//!     .prompt(
//!         Prompt::new("explain")
//!             .description("Explain a concept")
//!             .template(MessageTemplate::user("Explain {{topic}} simply.")),
//!     )
//!     .static_resource("/about", "About", ResourceOutput::text("a demo server"))
//!     .build()?;
//!
//! server.serve_stdio().await;
//! # Ok(())
//! # }
//! ```

pub use mcpserve_core as core;
pub use mcpserve_server as server;
pub use mcpserve_transport as transport;

pub use mcpserve_core::{
    capability::{ClientCapabilities, ClientInfo, SamplingCapability, ServerCapabilities, ServerInfo},
    error::{JsonRpcError, McpError},
    protocol::{Message, Notification, ProgressToken, Request, RequestId, Response},
    roots::RootSet,
    types::{
        CallToolResult, Content, ContentKind, CreateMessageRequest, CreateMessageResult,
        GetPromptResult, MessageTemplate, ModelPreferences, Prompt, PromptArgument, PromptMessage,
        Resource, ResourceOutput, ResourceTemplate, Role, SamplingMessage, StopReason, Tool,
        ToolOutput,
    },
    uri::UriTemplate,
    version::ProtocolVersion,
};
pub use mcpserve_server::{
    Context, Dispatcher, McpServer, RegisteredResource, Registry, ResourceKind, ResourceRequest,
    SamplingConfig, ServerBuilder, Session, SessionManager,
};
pub use mcpserve_transport::{
    MemoryTransport, StdioTransport, TcpTransportListener, Transport, TransportListener,
};

/// Prelude for server authors.
pub mod prelude {
    pub use mcpserve_core::error::McpError;
    pub use mcpserve_core::roots::RootSet;
    pub use mcpserve_core::types::{
        CallToolResult, Content, CreateMessageRequest, MessageTemplate, ModelPreferences, Prompt,
        ResourceOutput, Role, SamplingMessage, Tool, ToolOutput,
    };
    pub use mcpserve_core::version::ProtocolVersion;
    pub use mcpserve_server::{Context, McpServer, ResourceRequest, SamplingConfig, ServerBuilder};
    pub use mcpserve_transport::{Transport, TransportListener};
}
