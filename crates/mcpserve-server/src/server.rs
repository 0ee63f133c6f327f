//! Server facade and fluent builder.
//!
//! [`ServerBuilder`] wires registrations into a runnable [`McpServer`];
//! transport selection is independent of registration, and registration
//! remains possible after the server is running — late registrations
//! broadcast the matching `notifications/*/list_changed` to every live
//! session.
//!
//! # Example
//!
//! ```rust,no_run
//! use mcpserve_core::types::{ResourceOutput, Tool, ToolOutput};
//! use mcpserve_server::McpServer;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), mcpserve_core::McpError> {
//! let server = McpServer::builder("demo", "1.0.0")
//!     .tool(
//!         Tool::new("echo").description("Echo the input"),
//!         |_ctx, args: serde_json::Value| async move {
//!             Ok(ToolOutput::text(args.to_string()))
//!         },
//!     )
//!     .static_resource("/motd", "Message of the day", ResourceOutput::text("hello"))
//!     .root("/srv/data")
//!     .build()?;
//!
//! server.serve_stdio().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use mcpserve_core::capability::{ServerCapabilities, ServerInfo};
use mcpserve_core::error::McpError;
use mcpserve_core::roots::RootSet;
use mcpserve_core::types::{Prompt, ResourceOutput, Tool, ToolOutput};
use mcpserve_transport::{StdioTransport, TcpTransportListener, Transport, TransportListener};

use crate::adapter;
use crate::context::Context;
use crate::dispatcher::{notifications, Dispatcher};
use crate::handler::{
    resource_handler, tool_handler, typed_tool_handler, ResourceRequest,
};
use crate::registry::{RegisteredResource, Registry, ResourceKind};
use crate::sampling::{SamplingConfig, SamplingController};
use crate::session::SessionManager;
use crate::subscriptions::SubscriptionManager;
use crate::cancellation::CancellationRegistry;

/// Fluent builder for an [`McpServer`].
///
/// Registration errors (duplicate names, malformed patterns) are deferred:
/// the chain stays fluent and [`ServerBuilder::build`] reports the first
/// failure.
pub struct ServerBuilder {
    server_info: ServerInfo,
    capabilities: ServerCapabilities,
    registry: Registry,
    roots: RootSet,
    sampling: SamplingConfig,
    error: Option<McpError>,
}

impl ServerBuilder {
    /// Start a builder for a server with the given identity.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: ServerInfo::new(name, version),
            capabilities: ServerCapabilities::new()
                .with_tools()
                .with_resources()
                .with_prompts(),
            registry: Registry::new(),
            roots: RootSet::new(),
            sampling: SamplingConfig::default(),
            error: None,
        }
    }

    fn record(&mut self, result: Result<(), McpError>) {
        if self.error.is_none() {
            if let Err(err) = result {
                self.error = Some(err);
            }
        }
    }

    /// Override the advertised capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Register a tool with a raw-arguments handler.
    #[must_use]
    pub fn tool<F, Fut>(mut self, tool: Tool, handler: F) -> Self
    where
        F: Fn(Context, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ToolOutput, McpError>> + Send + 'static,
    {
        let result = self.registry.register_tool(tool, tool_handler(handler));
        self.record(result);
        self
    }

    /// Register a tool whose input schema is derived from the typed
    /// argument struct.
    #[must_use]
    pub fn typed_tool<A, F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(Context, A) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ToolOutput, McpError>> + Send + 'static,
    {
        let (schema, boxed) = typed_tool_handler(handler);
        let tool = Tool::new(name)
            .description(description)
            .input_schema(schema);
        let result = self.registry.register_tool(tool, boxed);
        self.record(result);
        self
    }

    /// Attach annotations to a tool name.
    #[must_use]
    pub fn annotate_tool(
        mut self,
        name: impl Into<String>,
        annotations: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.registry.annotate_tool(name, annotations);
        self
    }

    /// Register a static resource with fixed content.
    #[must_use]
    pub fn static_resource(
        mut self,
        pattern: impl Into<String>,
        name: impl Into<String>,
        output: ResourceOutput,
    ) -> Self {
        let result = Registry::build_resource(pattern, name, ResourceKind::Static(output))
            .and_then(|resource| self.registry.register_resource(resource));
        self.record(result);
        self
    }

    /// Register a dynamic resource or template with a handler.
    #[must_use]
    pub fn resource_fn<F, Fut>(
        mut self,
        pattern: impl Into<String>,
        name: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(Context, ResourceRequest) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ResourceOutput, McpError>> + Send + 'static,
    {
        let result = Registry::build_resource(
            pattern,
            name,
            ResourceKind::Dynamic(resource_handler(handler)),
        )
        .and_then(|resource| self.registry.register_resource(resource));
        self.record(result);
        self
    }

    /// Register a fully-specified resource (description, MIME type, tags,
    /// defaults).
    #[must_use]
    pub fn resource(mut self, resource: RegisteredResource) -> Self {
        let result = self.registry.register_resource(resource);
        self.record(result);
        self
    }

    /// Register a prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: Prompt) -> Self {
        let result = self.registry.register_prompt(prompt);
        self.record(result);
        self
    }

    /// Add a filesystem root.
    #[must_use]
    pub fn root(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.roots.add(path);
        self
    }

    /// Configure the sampling controller.
    #[must_use]
    pub fn sampling(mut self, config: SamplingConfig) -> Self {
        self.sampling = config;
        self
    }

    /// Finish the builder.
    ///
    /// Returns the first registration error recorded along the chain.
    pub fn build(self) -> Result<McpServer, McpError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let registry = Arc::new(self.registry);
        let sessions = Arc::new(SessionManager::new());
        let dispatcher = Arc::new(Dispatcher::new(
            self.server_info,
            self.capabilities,
            registry.clone(),
            sessions.clone(),
            Arc::new(SubscriptionManager::new()),
            Arc::new(CancellationRegistry::new()),
            Arc::new(SamplingController::new(self.sampling)),
            Arc::new(self.roots),
        ));
        let (shutdown_tx, _) = watch::channel(false);
        Ok(McpServer {
            inner: Arc::new(ServerInner {
                dispatcher,
                registry,
                sessions,
                shutdown_tx,
            }),
        })
    }
}

struct ServerInner {
    dispatcher: Arc<Dispatcher>,
    registry: Arc<Registry>,
    sessions: Arc<SessionManager>,
    shutdown_tx: watch::Sender<bool>,
}

/// A runnable MCP server.
///
/// Cheap to clone; clones share the same runtime state, so one handle can
/// serve while another registers capabilities or calls
/// [`McpServer::close`].
#[derive(Clone)]
pub struct McpServer {
    inner: Arc<ServerInner>,
}

impl McpServer {
    /// Start a builder.
    #[must_use]
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ServerBuilder {
        ServerBuilder::new(name, version)
    }

    /// The dispatcher, for direct wiring in tests or embeddings.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /// The subscription manager, for server-side `Notify` calls.
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        self.inner.dispatcher.subscriptions()
    }

    /// Emit a resource update to every session subscribed to `uri`.
    pub fn notify_resource_updated(&self, uri: &str, payload: serde_json::Value) {
        self.inner
            .dispatcher
            .subscriptions()
            .notify(uri, payload, &self.inner.sessions);
    }

    // =========================================================================
    // Late registration
    // =========================================================================

    /// Register a tool after startup.
    pub fn register_tool<F, Fut>(&self, tool: Tool, handler: F) -> Result<(), McpError>
    where
        F: Fn(Context, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ToolOutput, McpError>> + Send + 'static,
    {
        self.inner
            .registry
            .register_tool(tool, tool_handler(handler))?;
        self.inner
            .sessions
            .broadcast(notifications::TOOLS_LIST_CHANGED, None);
        Ok(())
    }

    /// Register a resource after startup.
    pub fn register_resource(&self, resource: RegisteredResource) -> Result<(), McpError> {
        self.inner.registry.register_resource(resource)?;
        self.inner
            .sessions
            .broadcast(notifications::RESOURCES_LIST_CHANGED, None);
        Ok(())
    }

    /// Register a prompt after startup.
    pub fn register_prompt(&self, prompt: Prompt) -> Result<(), McpError> {
        self.inner.registry.register_prompt(prompt)?;
        self.inner
            .sessions
            .broadcast(notifications::PROMPTS_LIST_CHANGED, None);
        Ok(())
    }

    // =========================================================================
    // Transports
    // =========================================================================

    /// Serve a single already-connected transport until EOF or close.
    pub async fn serve_transport<T: Transport>(&self, transport: T) {
        adapter::serve_peer(
            self.inner.dispatcher.clone(),
            Arc::new(transport),
            self.inner.shutdown_tx.subscribe(),
        )
        .await;
    }

    /// Serve the process's stdin/stdout.
    pub async fn serve_stdio(&self) {
        self.serve_transport(StdioTransport::new()).await;
    }

    /// Serve peers accepted from a listener until close.
    pub async fn serve_listener<L: TransportListener>(&self, listener: L) -> Result<(), McpError> {
        adapter::serve_listener(
            self.inner.dispatcher.clone(),
            listener,
            self.inner.shutdown_tx.subscribe(),
        )
        .await
    }

    /// Bind a TCP listener and serve it.
    pub async fn serve_tcp(&self, addr: impl tokio::net::ToSocketAddrs) -> Result<(), McpError> {
        let listener = TcpTransportListener::bind(addr)
            .await
            .map_err(|err| McpError::transport_with_source("tcp bind failed", err))?;
        self.serve_listener(listener).await
    }

    /// Bind a Unix-socket listener and serve it.
    #[cfg(unix)]
    pub async fn serve_unix(&self, path: impl AsRef<std::path::Path>) -> Result<(), McpError> {
        let listener = mcpserve_transport::UnixTransportListener::bind(path)
            .map_err(|err| McpError::transport_with_source("unix bind failed", err))?;
        self.serve_listener(listener).await
    }

    /// Stop every serving loop and release all sessions. Idempotent.
    pub fn close(&self) {
        let _ = self.inner.shutdown_tx.send(true);
        self.inner.sessions.close_all();
    }
}
