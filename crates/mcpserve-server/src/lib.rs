//! # mcpserve-server
//!
//! The mcpserve runtime: a transport-agnostic, version-aware JSON-RPC
//! dispatcher exposing tools, resources, and prompts to MCP clients.
//!
//! The moving parts, leaves first:
//!
//! - [`session`] — per-peer identity: negotiated version, capabilities,
//!   metadata, outbound push, server→client request correlation
//! - [`registry`] — append-only tool/resource/prompt catalogs with
//!   URI-template resolution
//! - [`cancellation`] — cooperative per-request cancellation tokens
//! - [`sampling`] — rate/concurrency/token/priority enforcement for
//!   server→client LLM sampling
//! - [`subscriptions`] — per-URI subscriber sets for
//!   `notifications/resources/updated`
//! - [`dispatcher`] — frame in, frame out: decode, route, invoke, shape
//! - [`shape`] — version-gated resource-read envelopes
//! - [`adapter`] — per-peer read/write loops over any framed transport
//! - [`server`] — the fluent builder and runnable facade
//!
//! # Example
//!
//! ```rust,no_run
//! use mcpserve_core::types::ToolOutput;
//! use mcpserve_server::McpServer;
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct AddArgs {
//!     x: f64,
//!     y: f64,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), mcpserve_core::McpError> {
//! let server = McpServer::builder("adder", "1.0.0")
//!     .typed_tool("add", "Add two numbers", |_ctx, args: AddArgs| async move {
//!         Ok(ToolOutput::text((args.x + args.y).to_string()))
//!     })
//!     .build()?;
//! server.serve_stdio().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod cancellation;
pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod sampling;
pub mod server;
pub mod session;
pub mod shape;
pub mod subscriptions;

pub use cancellation::{CancellationRegistry, CancellationToken};
pub use context::Context;
pub use dispatcher::{methods, notifications, Dispatcher};
pub use handler::{BoxedResourceHandler, BoxedToolHandler, ResourceRequest};
pub use registry::{RegisteredResource, Registry, ResourceKind};
pub use sampling::{SamplingConfig, SamplingController, SamplingStats};
pub use server::{McpServer, ServerBuilder};
pub use session::{SendFrame, Session, SessionId, SessionManager};
pub use subscriptions::SubscriptionManager;
