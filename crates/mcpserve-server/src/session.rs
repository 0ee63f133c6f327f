//! Session lifecycle and per-session state.
//!
//! A [`Session`] is the identity of one connected peer: its negotiated
//! protocol version, declared capabilities, metadata, and — through the
//! send closure the transport adapter installs — the only path by which
//! the server can push frames to that peer. Sessions also correlate
//! server→client requests (sampling) with their responses.
//!
//! The negotiated version is immutable after the first successful
//! `initialize`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use uuid::Uuid;

use mcpserve_core::capability::{ClientCapabilities, ClientInfo};
use mcpserve_core::error::McpError;
use mcpserve_core::protocol::{Message, Notification, Request, RequestId, Response};
use mcpserve_core::version::ProtocolVersion;

/// Session identifier.
pub type SessionId = Uuid;

/// A thread-safe closure that writes one frame to the session's peer.
///
/// The transport adapter supplies this at session creation; nothing else
/// of the transport is shared with the session.
pub type SendFrame = Arc<dyn Fn(Bytes) -> Result<(), McpError> + Send + Sync>;

/// Per-peer state.
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    version: RwLock<Option<ProtocolVersion>>,
    client_info: RwLock<ClientInfo>,
    client_caps: RwLock<ClientCapabilities>,
    metadata: RwLock<HashMap<String, serde_json::Value>>,
    initialized: AtomicBool,
    send: SendFrame,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Response>>>,
    next_outgoing_id: AtomicU64,
    closed: AtomicBool,
}

impl Session {
    /// Create a session bound to the given send closure.
    #[must_use]
    pub fn new(send: SendFrame) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            version: RwLock::new(None),
            client_info: RwLock::new(ClientInfo::default()),
            client_caps: RwLock::new(ClientCapabilities::default()),
            metadata: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            send,
            pending: Mutex::new(HashMap::new()),
            next_outgoing_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    /// The session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// When the session was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The negotiated protocol version, if initialized.
    #[must_use]
    pub fn version(&self) -> Option<ProtocolVersion> {
        *self.version.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The version used to shape responses: the negotiated one, or the
    /// default until the handshake completes.
    #[must_use]
    pub fn effective_version(&self) -> ProtocolVersion {
        self.version().unwrap_or_default()
    }

    /// Whether the initialize handshake has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Complete the initialize handshake.
    ///
    /// Fails if the session already negotiated a version; the negotiated
    /// version never changes afterwards.
    pub fn initialize(
        &self,
        version: ProtocolVersion,
        info: ClientInfo,
        caps: ClientCapabilities,
    ) -> Result<(), McpError> {
        {
            let mut slot = self
                .version
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if slot.is_some() {
                return Err(McpError::invalid_request("session is already initialized"));
            }
            *slot = Some(version);
        }
        *self
            .client_info
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = info;
        *self
            .client_caps
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = caps;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Snapshot of the client's declared info.
    #[must_use]
    pub fn client_info(&self) -> ClientInfo {
        self.client_info
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the client's declared capabilities.
    #[must_use]
    pub fn client_caps(&self) -> ClientCapabilities {
        self.client_caps
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Read a metadata value.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<serde_json::Value> {
        self.metadata
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Set a metadata value. This is the only sanctioned way to mutate
    /// session state from a handler.
    pub fn update_metadata(&self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Push a message to the peer.
    pub fn send_message(&self, message: &Message) -> Result<(), McpError> {
        if self.is_closed() {
            return Err(McpError::transport("session is closed"));
        }
        let frame = message.encode()?;
        (self.send)(Bytes::from(frame))
    }

    /// Push a notification to the peer.
    pub fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<(), McpError> {
        let notification = match params {
            Some(params) => Notification::with_params(method.to_string(), params),
            None => Notification::new(method.to_string()),
        };
        self.send_message(&Message::Notification(notification))
    }

    /// Send a server→client request and await the correlated response.
    ///
    /// Used for sampling: the request travels to the peer that owns this
    /// session, and the adapter routes the client's response back through
    /// [`Self::complete_response`].
    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Response, McpError> {
        let id = RequestId::String(format!(
            "srv-{}",
            self.next_outgoing_id.fetch_add(1, Ordering::Relaxed)
        ));
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id.clone(), tx);

        let request = Request::with_params(method.to_string(), id.clone(), params);
        if let Err(err) = self.send_message(&Message::Request(request)) {
            self.pending
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(&id);
            return Err(err);
        }

        rx.await
            .map_err(|_| McpError::transport("session closed while awaiting client response"))
    }

    /// Route a response from the peer to whichever `request` call is
    /// awaiting it. Returns false when nothing was waiting on the id.
    pub fn complete_response(&self, response: Response) -> bool {
        let waiter = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&response.id);
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Close the session: no further frames leave, and every pending
    /// server→client request resolves with an error.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("version", &self.version())
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// The table of live sessions.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a session bound to the given send closure.
    pub fn create(&self, send: SendFrame) -> Arc<Session> {
        let session = Session::new(send);
        self.sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(session.id(), session.clone());
        tracing::debug!(session_id = %session.id(), "session created");
        session
    }

    /// Look up a session by id.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Remove and close a session.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&id);
        if let Some(session) = &session {
            session.close();
            tracing::debug!(session_id = %id, "session removed");
        }
        session
    }

    /// Snapshot of all live sessions.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a notification to every live session, best-effort.
    pub fn broadcast(&self, method: &str, params: Option<serde_json::Value>) {
        for session in self.all() {
            if let Err(err) = session.notify(method, params.clone()) {
                tracing::debug!(
                    session_id = %session.id(),
                    error = %err,
                    "broadcast notification dropped"
                );
            }
        }
    }

    /// Close and drop every session.
    pub fn close_all(&self) {
        let mut table = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for session in table.values() {
            session.close();
        }
        table.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn collecting_send() -> (SendFrame, Arc<StdMutex<Vec<Bytes>>>) {
        let frames = Arc::new(StdMutex::new(Vec::new()));
        let sink = frames.clone();
        let send: SendFrame = Arc::new(move |frame| {
            sink.lock().unwrap().push(frame);
            Ok(())
        });
        (send, frames)
    }

    #[test]
    fn version_is_immutable_after_initialize() {
        let (send, _) = collecting_send();
        let session = Session::new(send);
        session
            .initialize(
                ProtocolVersion::V2025_03_26,
                ClientInfo::default(),
                ClientCapabilities::default(),
            )
            .unwrap();
        assert_eq!(session.version(), Some(ProtocolVersion::V2025_03_26));

        let err = session
            .initialize(
                ProtocolVersion::Draft,
                ClientInfo::default(),
                ClientCapabilities::default(),
            )
            .unwrap_err();
        assert_eq!(err.code(), -32600);
        assert_eq!(session.version(), Some(ProtocolVersion::V2025_03_26));
    }

    #[test]
    fn effective_version_defaults_before_handshake() {
        let (send, _) = collecting_send();
        let session = Session::new(send);
        assert_eq!(session.effective_version(), ProtocolVersion::DEFAULT);
        assert!(!session.is_initialized());
    }

    #[test]
    fn notifications_flow_through_the_send_closure() {
        let (send, frames) = collecting_send();
        let session = Session::new(send);
        session
            .notify("notifications/progress", Some(serde_json::json!({"progress": 1})))
            .unwrap();
        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let text = std::str::from_utf8(&frames[0]).unwrap();
        assert!(text.contains("notifications/progress"));
    }

    #[test]
    fn metadata_updates_are_visible() {
        let (send, _) = collecting_send();
        let session = Session::new(send);
        assert!(session.metadata("user").is_none());
        session.update_metadata("user", serde_json::json!("alice"));
        assert_eq!(session.metadata("user"), Some(serde_json::json!("alice")));
    }

    #[tokio::test]
    async fn request_response_correlation() {
        let (send, frames) = collecting_send();
        let session = Session::new(send);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .request("sampling/createMessage", serde_json::json!({}))
                    .await
            })
        };
        tokio::task::yield_now().await;

        // Pull the outgoing id off the captured frame and answer it.
        let frame = frames.lock().unwrap().remove(0);
        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        let id = value["id"].as_str().unwrap().to_string();
        assert!(session.complete_response(Response::success(
            RequestId::String(id),
            serde_json::json!({"role": "assistant"})
        )));

        let response = waiter.await.unwrap().unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn unknown_response_ids_are_ignored() {
        let (send, _) = collecting_send();
        let session = Session::new(send);
        assert!(!session.complete_response(Response::success(
            RequestId::String("srv-99".into()),
            serde_json::json!({})
        )));
    }

    #[tokio::test]
    async fn close_fails_pending_requests() {
        let (send, _) = collecting_send();
        let session = Session::new(send);
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .request("sampling/createMessage", serde_json::json!({}))
                    .await
            })
        };
        tokio::task::yield_now().await;
        session.close();
        let result = waiter.await.unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn manager_lifecycle() {
        let manager = SessionManager::new();
        let (send, _) = collecting_send();
        let session = manager.create(send);
        assert_eq!(manager.len(), 1);
        assert!(manager.get(session.id()).is_some());

        manager.remove(session.id());
        assert!(manager.is_empty());
        assert!(session.is_closed());
    }

    #[test]
    fn broadcast_reaches_every_session() {
        let manager = SessionManager::new();
        let (send_a, frames_a) = collecting_send();
        let (send_b, frames_b) = collecting_send();
        manager.create(send_a);
        manager.create(send_b);

        manager.broadcast("notifications/tools/list_changed", None);
        assert_eq!(frames_a.lock().unwrap().len(), 1);
        assert_eq!(frames_b.lock().unwrap().len(), 1);
    }
}
