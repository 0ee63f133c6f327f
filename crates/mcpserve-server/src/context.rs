//! Per-request handler context.
//!
//! Every handler invocation receives an owned [`Context`]: the session it
//! serves, the negotiated version, the request id, a progress sink, the
//! request's cancellation token, the sampling controller, and the
//! configured roots. Handlers treat the context as read-only; the one
//! sanctioned mutation path is [`Session::update_metadata`] on the session
//! it exposes.

use std::path::Path;
use std::sync::Arc;

use mcpserve_core::error::McpError;
use mcpserve_core::protocol::{ProgressToken, RequestId};
use mcpserve_core::roots::RootSet;
use mcpserve_core::types::{CreateMessageRequest, CreateMessageResult};
use mcpserve_core::version::ProtocolVersion;

use crate::cancellation::CancellationToken;
use crate::sampling::SamplingController;
use crate::session::{Session, SessionId};

/// Context carried into a handler invocation.
#[derive(Clone)]
pub struct Context {
    session: Arc<Session>,
    request_id: RequestId,
    progress_token: Option<ProgressToken>,
    version: ProtocolVersion,
    cancel: CancellationToken,
    sampling: Arc<SamplingController>,
    roots: Arc<RootSet>,
}

impl Context {
    /// Assemble a context. Called by the dispatcher on handler entry.
    #[must_use]
    pub fn new(
        session: Arc<Session>,
        request_id: RequestId,
        progress_token: Option<ProgressToken>,
        cancel: CancellationToken,
        sampling: Arc<SamplingController>,
        roots: Arc<RootSet>,
    ) -> Self {
        let version = session.effective_version();
        Self {
            session,
            request_id,
            progress_token,
            version,
            cancel,
            sampling,
            roots,
        }
    }

    /// The session this request belongs to.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The session id.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    /// The id of the request being served.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// The negotiated protocol version.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Whether the request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Return a cancellation error if the request has been cancelled.
    ///
    /// Long-running handlers call this at every loop iteration or before
    /// every blocking step and propagate the error with `?`.
    pub fn check_cancellation(&self) -> Result<(), McpError> {
        if self.cancel.is_cancelled() {
            Err(McpError::cancelled(
                format!("request {}", self.request_id),
                self.cancel.reason(),
            ))
        } else {
            Ok(())
        }
    }

    /// A future resolving when the request is cancelled; race it against
    /// blocking work with `select!`.
    pub fn cancelled(&self) -> impl std::future::Future<Output = ()> {
        self.cancel.cancelled()
    }

    // =========================================================================
    // Notifications and progress
    // =========================================================================

    /// Push a notification to this request's session.
    pub fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<(), McpError> {
        self.session.notify(method, params)
    }

    /// Report progress for this request.
    ///
    /// Silently does nothing when the request carried no progress token.
    /// The notification shares the session's ordered outbound path, so it
    /// is flushed before the handler's response.
    pub fn report_progress(
        &self,
        progress: u64,
        total: Option<u64>,
        message: Option<&str>,
    ) -> Result<(), McpError> {
        let Some(token) = &self.progress_token else {
            return Ok(());
        };
        let params = serde_json::json!({
            "progressToken": token,
            "progress": progress,
            "total": total,
            "message": message,
        });
        self.notify("notifications/progress", Some(params))
    }

    // =========================================================================
    // Sampling
    // =========================================================================

    /// Ask the client behind this session to run an LLM sampling request.
    ///
    /// Subject to the controller's rate, concurrency, token, and content
    /// limits; rejections come back as [`McpError::SamplingRejected`].
    pub async fn request_sampling(
        &self,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResult, McpError> {
        self.sampling.request(&self.session, request).await
    }

    // =========================================================================
    // Roots
    // =========================================================================

    /// Whether a filesystem path falls inside the configured roots.
    #[must_use]
    pub fn is_path_in_roots(&self, path: impl AsRef<Path>) -> bool {
        self.roots.is_path_in_roots(path)
    }

    /// The configured roots.
    #[must_use]
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("session_id", &self.session_id())
            .field("request_id", &self.request_id)
            .field("version", &self.version)
            .field("is_cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
