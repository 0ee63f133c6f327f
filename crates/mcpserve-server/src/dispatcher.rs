//! The message dispatcher.
//!
//! Raw frame in, optional raw frame out. The dispatcher decodes the
//! JSON-RPC envelope, resolves the session, routes the method, invokes the
//! handler with a [`Context`] (cancellation seeded, progress sink bound),
//! and adapts the response shape to the session's negotiated version.
//!
//! Error channels, per the protocol:
//!
//! - malformed JSON → `-32700`, answered when an id is recoverable;
//! - a well-formed frame that is not an envelope → `-32600`;
//! - unknown methods, including client-only ones like `roots/list` →
//!   `-32601`;
//! - bad parameters, unknown tool/resource/prompt names → `-32602`;
//! - handler panics → `-32603`, logged with session and request ids;
//! - tool *failures* → in-band `{content, isError: true}`, never a
//!   JSON-RPC error;
//! - a cancelled request drops its handler's return value and answers with
//!   a cancellation error instead.

use std::sync::Arc;

use futures::FutureExt;

use mcpserve_core::capability::{ClientCapabilities, ClientInfo, InitializeResult, ServerCapabilities, ServerInfo};
use mcpserve_core::error::{JsonRpcError, McpError};
use mcpserve_core::protocol::{Message, Notification, Request, RequestId, Response};
use mcpserve_core::roots::RootSet;
use mcpserve_core::types::{CallToolResult, ResourceOutput, ToolOutput};
use mcpserve_core::version::ProtocolVersion;

use crate::cancellation::CancellationRegistry;
use crate::context::Context;
use crate::registry::{Registry, ResourceKind};
use crate::sampling::SamplingController;
use crate::session::{Session, SessionManager};
use crate::shape;
use crate::subscriptions::SubscriptionManager;

/// Server-implemented method names.
pub mod methods {
    /// Initialize the session and negotiate the protocol version.
    pub const INITIALIZE: &str = "initialize";
    /// Liveness check.
    pub const PING: &str = "ping";
    /// List tools.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Call a tool.
    pub const TOOLS_CALL: &str = "tools/call";
    /// List non-template resources.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// List resource templates.
    pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";
    /// Read a resource.
    pub const RESOURCES_READ: &str = "resources/read";
    /// Subscribe to resource updates.
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    /// Unsubscribe from resource updates.
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";
    /// List prompts.
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Render a prompt.
    pub const PROMPTS_GET: &str = "prompts/get";
    /// Client-only: list filesystem roots. Rejected server-side.
    pub const ROOTS_LIST: &str = "roots/list";
}

/// Notification method names.
pub mod notifications {
    /// Client signals the handshake finished.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Client cancels an in-flight request.
    pub const CANCELLED: &str = "notifications/cancelled";
    /// Server reports progress on a long-running request.
    pub const PROGRESS: &str = "notifications/progress";
    /// Server reports a subscribed resource changed.
    pub const RESOURCES_UPDATED: &str = "notifications/resources/updated";
    /// Server reports the tool catalog changed.
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
    /// Server reports the resource catalogs changed.
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    /// Server reports the prompt catalog changed.
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";
}

/// The version-aware JSON-RPC dispatcher.
pub struct Dispatcher {
    server_info: ServerInfo,
    capabilities: ServerCapabilities,
    registry: Arc<Registry>,
    sessions: Arc<SessionManager>,
    subscriptions: Arc<SubscriptionManager>,
    cancellations: Arc<CancellationRegistry>,
    sampling: Arc<SamplingController>,
    roots: Arc<RootSet>,
}

impl Dispatcher {
    /// Assemble a dispatcher over the shared runtime state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        server_info: ServerInfo,
        capabilities: ServerCapabilities,
        registry: Arc<Registry>,
        sessions: Arc<SessionManager>,
        subscriptions: Arc<SubscriptionManager>,
        cancellations: Arc<CancellationRegistry>,
        sampling: Arc<SamplingController>,
        roots: Arc<RootSet>,
    ) -> Self {
        Self {
            server_info,
            capabilities,
            registry,
            sessions,
            subscriptions,
            cancellations,
            sampling,
            roots,
        }
    }

    /// The session table.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The subscription table.
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    /// The cancellation registry.
    #[must_use]
    pub fn cancellations(&self) -> &Arc<CancellationRegistry> {
        &self.cancellations
    }

    /// The sampling controller.
    #[must_use]
    pub fn sampling(&self) -> &Arc<SamplingController> {
        &self.sampling
    }

    /// Release everything a session owns: its subscriptions, cancellation
    /// entries, sampling counters, and the session itself. Called by the
    /// transport adapter on peer teardown.
    pub fn teardown_session(&self, id: crate::session::SessionId) {
        self.subscriptions.unsubscribe_all(id);
        self.cancellations.remove_session(id);
        self.sampling.remove_session(id);
        self.sessions.remove(id);
    }

    /// Handle one raw frame end-to-end.
    ///
    /// Returns the encoded reply frame for requests (and for malformed
    /// frames whose id was recoverable); notifications, client responses,
    /// and unrecoverable garbage produce nothing.
    pub async fn handle(&self, session: &Arc<Session>, frame: &[u8]) -> Option<Vec<u8>> {
        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(envelope) => {
                let id = envelope.id?;
                tracing::debug!(
                    session_id = %session.id(),
                    request_id = %id,
                    error = %envelope.error,
                    "answering malformed frame"
                );
                let response = Response::error(id, JsonRpcError::from(&envelope.error));
                return Message::Response(response).encode().ok();
            }
        };

        match message {
            Message::Request(request) => {
                let response = self.handle_request(session, request).await;
                Message::Response(response).encode().ok()
            }
            Message::Notification(notification) => {
                self.handle_notification(session, &notification);
                None
            }
            Message::Response(response) => {
                self.handle_response(session, response);
                None
            }
        }
    }

    /// Handle a decoded request. Every request yields exactly one response
    /// carrying the same id.
    pub async fn handle_request(&self, session: &Arc<Session>, request: Request) -> Response {
        let id = request.id.clone();
        let method = request.method.to_string();
        tracing::debug!(
            session_id = %session.id(),
            request_id = %id,
            method = %method,
            "handling request"
        );

        let result = match method.as_str() {
            methods::INITIALIZE => self.handle_initialize(session, &request),
            // Liveness works before the handshake.
            methods::PING => Ok(serde_json::json!({})),
            _ if !session.is_initialized() => Err(McpError::invalid_request(
                "session is not initialized; send initialize first",
            )),
            methods::TOOLS_LIST => Ok(serde_json::json!({ "tools": self.registry.list_tools() })),
            methods::TOOLS_CALL => self.call_tool(session, &request).await,
            methods::RESOURCES_LIST => {
                Ok(serde_json::json!({ "resources": self.registry.list_resources() }))
            }
            methods::RESOURCES_TEMPLATES_LIST => Ok(serde_json::json!({
                "resourceTemplates": self.registry.list_templates()
            })),
            methods::RESOURCES_READ => self.read_resource(session, &request).await,
            methods::RESOURCES_SUBSCRIBE => self.subscribe(session, &request, true),
            methods::RESOURCES_UNSUBSCRIBE => self.subscribe(session, &request, false),
            methods::PROMPTS_LIST => Ok(self.list_prompts()),
            methods::PROMPTS_GET => self.get_prompt(&request),
            // Client-only surface invoked server-side.
            methods::ROOTS_LIST => Err(McpError::method_not_found(method.clone())),
            _ => Err(McpError::method_not_found(method.clone())),
        };

        match result {
            Ok(value) => Response::success(id, value),
            Err(err) => {
                tracing::debug!(
                    session_id = %session.id(),
                    request_id = %id,
                    method = %method,
                    error = %err,
                    "request failed"
                );
                Response::error(id, JsonRpcError::from(&err))
            }
        }
    }

    /// Handle a decoded notification. Synchronous so the transport adapter
    /// can process it inline, guaranteeing a cancellation lands before any
    /// later request from the same peer is dispatched.
    pub fn handle_notification(&self, session: &Arc<Session>, notification: &Notification) {
        match notification.method.as_ref() {
            notifications::INITIALIZED => {
                tracing::debug!(session_id = %session.id(), "client reports initialized");
            }
            notifications::CANCELLED => {
                let Some(params) = &notification.params else {
                    return;
                };
                let Some(request_id) = params
                    .get("requestId")
                    .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok())
                else {
                    return;
                };
                let reason = params
                    .get("reason")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string);
                self.cancellations.cancel(session.id(), &request_id, reason);
            }
            other => {
                tracing::debug!(
                    session_id = %session.id(),
                    method = %other,
                    "ignoring unknown notification"
                );
            }
        }
    }

    /// Route a client response (e.g. to a sampling request) to its waiter.
    pub fn handle_response(&self, session: &Arc<Session>, response: Response) {
        if !session.complete_response(response) {
            tracing::debug!(
                session_id = %session.id(),
                "dropping response to unknown request id"
            );
        }
    }

    // =========================================================================
    // initialize
    // =========================================================================

    fn handle_initialize(
        &self,
        session: &Arc<Session>,
        request: &Request,
    ) -> Result<serde_json::Value, McpError> {
        let params = request.params.clone().unwrap_or_else(|| serde_json::json!({}));

        let requested = params
            .get("protocolVersion")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        let version = ProtocolVersion::select(requested)
            .map_err(|err| McpError::invalid_params(methods::INITIALIZE, err.to_string()))?;

        let client_info: ClientInfo = params
            .get("clientInfo")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let client_caps: ClientCapabilities = params
            .get("capabilities")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        session.initialize(version, client_info.clone(), client_caps)?;
        tracing::info!(
            session_id = %session.id(),
            version = %version,
            client = %client_info.name,
            "session initialized"
        );

        let result = InitializeResult {
            protocol_version: version,
            server_info: self.server_info.clone(),
            capabilities: self.capabilities.clone(),
        };
        serde_json::to_value(result)
            .map_err(|err| McpError::internal_with_source("failed to encode initialize result", err))
    }

    // =========================================================================
    // tools
    // =========================================================================

    async fn call_tool(
        &self,
        session: &Arc<Session>,
        request: &Request,
    ) -> Result<serde_json::Value, McpError> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| McpError::invalid_params(methods::TOOLS_CALL, "missing params"))?;
        let name = params
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| McpError::invalid_params(methods::TOOLS_CALL, "missing tool name"))?;
        let args = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        let registered = self
            .registry
            .tool(name)
            .ok_or_else(|| McpError::tool_not_found(name))?;

        crate::handler::validate_args(&registered.tool.input_schema, &args)
            .map_err(|message| McpError::invalid_params(methods::TOOLS_CALL, message))?;

        let token = self
            .cancellations
            .register(session.id(), request.id.clone());
        let ctx = Context::new(
            session.clone(),
            request.id.clone(),
            request.progress_token(),
            token.clone(),
            self.sampling.clone(),
            self.roots.clone(),
        );

        let invocation =
            std::panic::AssertUnwindSafe((registered.handler)(ctx, args)).catch_unwind();
        let outcome = invocation.await;
        self.cancellations.remove(session.id(), &request.id);

        let result = match outcome {
            Err(panic) => {
                tracing::error!(
                    session_id = %session.id(),
                    request_id = %request.id,
                    tool = %name,
                    "tool handler panicked"
                );
                return Err(McpError::internal(format!(
                    "tool '{name}' panicked: {}",
                    panic_message(panic.as_ref())
                )));
            }
            Ok(result) => result,
        };

        // A cancelled request's return value is dropped; the client sees a
        // cancellation error, never a late success frame.
        if token.is_cancelled() {
            return Err(McpError::cancelled(
                format!("tools/call {name}"),
                token.reason(),
            ));
        }

        let call_result: CallToolResult = match result {
            Ok(output) => output.into(),
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err @ McpError::InvalidParams { .. }) => return Err(err),
            // Tool failures are in-band results, not protocol errors.
            Err(err) => ToolOutput::error(err.to_string()).into(),
        };

        let version = session.effective_version();
        let content: Vec<serde_json::Value> = call_result
            .content
            .iter()
            .map(|item| item.to_wire(version))
            .collect();
        Ok(serde_json::json!({
            "content": content,
            "isError": call_result.is_error,
        }))
    }

    // =========================================================================
    // resources
    // =========================================================================

    async fn read_resource(
        &self,
        session: &Arc<Session>,
        request: &Request,
    ) -> Result<serde_json::Value, McpError> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| McpError::invalid_params(methods::RESOURCES_READ, "missing params"))?;
        let uri = params
            .get("uri")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| McpError::invalid_params(methods::RESOURCES_READ, "missing uri"))?;
        let extra = params.get("parameters").and_then(serde_json::Value::as_object);

        let resolved = self
            .registry
            .resolve_resource(uri, extra)
            .ok_or_else(|| McpError::resource_not_found(uri))?;

        let output: ResourceOutput = match &resolved.resource.kind {
            ResourceKind::Static(output) => output.clone(),
            ResourceKind::Dynamic(handler) => {
                let token = self
                    .cancellations
                    .register(session.id(), request.id.clone());
                let ctx = Context::new(
                    session.clone(),
                    request.id.clone(),
                    request.progress_token(),
                    token.clone(),
                    self.sampling.clone(),
                    self.roots.clone(),
                );
                let invocation = std::panic::AssertUnwindSafe(handler(ctx, resolved.request))
                    .catch_unwind();
                let outcome = invocation.await;
                self.cancellations.remove(session.id(), &request.id);
                match outcome {
                    Err(panic) => {
                        tracing::error!(
                            session_id = %session.id(),
                            request_id = %request.id,
                            uri,
                            "resource handler panicked"
                        );
                        return Err(McpError::internal(format!(
                            "resource '{uri}' panicked: {}",
                            panic_message(panic.as_ref())
                        )));
                    }
                    Ok(result) => {
                        if token.is_cancelled() {
                            return Err(McpError::cancelled(
                                format!("resources/read {uri}"),
                                token.reason(),
                            ));
                        }
                        result?
                    }
                }
            }
        };

        let mut shaped =
            shape::resource_read_result(session.effective_version(), uri, &output);
        // A registered MIME type rides along when the handler set none.
        if let (Some(mime), None) = (
            &resolved.resource.mime_type,
            output.metadata.as_ref().and_then(|m| m.get("mimeType")),
        ) {
            if session.effective_version().uses_wrapped_contents() {
                shaped["contents"][0]["mimeType"] = serde_json::json!(mime);
            }
        }
        Ok(shaped)
    }

    fn subscribe(
        &self,
        session: &Arc<Session>,
        request: &Request,
        subscribing: bool,
    ) -> Result<serde_json::Value, McpError> {
        let method = if subscribing {
            methods::RESOURCES_SUBSCRIBE
        } else {
            methods::RESOURCES_UNSUBSCRIBE
        };
        let uri = request
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| McpError::invalid_params(method, "missing uri"))?;
        if subscribing {
            self.subscriptions.subscribe(uri, session.id());
        } else {
            self.subscriptions.unsubscribe(uri, session.id());
        }
        Ok(serde_json::json!({}))
    }

    // =========================================================================
    // prompts
    // =========================================================================

    fn list_prompts(&self) -> serde_json::Value {
        let prompts: Vec<serde_json::Value> = self
            .registry
            .list_prompts()
            .into_iter()
            .map(|(prompt, arguments)| {
                serde_json::json!({
                    "name": prompt.name,
                    "description": prompt.description,
                    "arguments": arguments,
                })
            })
            .collect();
        serde_json::json!({ "prompts": prompts })
    }

    fn get_prompt(&self, request: &Request) -> Result<serde_json::Value, McpError> {
        let params = request
            .params
            .as_ref()
            .ok_or_else(|| McpError::invalid_params(methods::PROMPTS_GET, "missing params"))?;
        let name = params
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| McpError::invalid_params(methods::PROMPTS_GET, "missing prompt name"))?;
        let variables = params
            .get("variables")
            .or_else(|| params.get("arguments"))
            .and_then(serde_json::Value::as_object)
            .cloned()
            .unwrap_or_default();

        let prompt = self
            .registry
            .prompt(name)
            .ok_or_else(|| McpError::prompt_not_found(name))?;
        let rendered = prompt.render(&variables)?;
        serde_json::to_value(rendered)
            .map_err(|err| McpError::internal_with_source("failed to encode prompt", err))
    }
}

/// Best-effort text of a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
