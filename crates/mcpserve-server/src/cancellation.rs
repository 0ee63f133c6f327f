//! Cooperative cancellation.
//!
//! The registry keys a cancellation token by `(session, request-id)`. The
//! dispatcher seeds a token on handler entry; `notifications/cancelled`
//! with a matching id fires it; completion removes it. Cancellation for an
//! unknown or already-completed request is a no-op, and a token fired in
//! one session can never reach a request of another session.
//!
//! Cancellation is cooperative throughout: the dispatcher never aborts a
//! running handler. Handlers poll the token (directly or through
//! `Context::check_cancellation`) and unwind with a cancelled error; a
//! handler that ignores the signal simply runs to completion and has its
//! result discarded.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::task::{Context as TaskContext, Poll};

use mcpserve_core::protocol::RequestId;

use crate::session::SessionId;

/// A shared flag observing one request's cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl CancellationToken {
    /// Create a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The reason supplied with the cancellation, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Fire the token.
    pub fn cancel(&self, reason: Option<String>) {
        *self
            .inner
            .reason
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = reason;
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// A future that resolves once the token fires.
    ///
    /// Polling-based: handlers are expected to check at loop iterations or
    /// race this against their own work with `select!`.
    #[must_use]
    pub fn cancelled(&self) -> CancelledFuture {
        CancelledFuture {
            inner: self.inner.clone(),
        }
    }
}

/// Future returned by [`CancellationToken::cancelled`].
pub struct CancelledFuture {
    inner: Arc<TokenInner>,
}

impl Future for CancelledFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            Poll::Ready(())
        } else {
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Live cancellation tokens keyed by `(session, request-id)`.
#[derive(Default)]
pub struct CancellationRegistry {
    entries: RwLock<HashMap<(SessionId, RequestId), CancellationToken>>,
}

impl CancellationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a token for a request, or return the live one if the key is
    /// already seeded. The transport adapter seeds on the read loop before
    /// the request task is spawned, so a cancellation arriving right
    /// behind its request always finds the token; the dispatcher then
    /// picks the same token up at handler entry.
    pub fn register(&self, session: SessionId, request: RequestId) -> CancellationToken {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry((session, request))
            .or_default()
            .clone()
    }

    /// Fire the token for a request, if one is live. Unknown or completed
    /// requests are a no-op.
    pub fn cancel(&self, session: SessionId, request: &RequestId, reason: Option<String>) {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(token) = entries.get(&(session, request.clone())) {
            tracing::debug!(session_id = %session, request_id = %request, "request cancelled");
            token.cancel(reason);
        }
    }

    /// Drop the token after the request returns.
    pub fn remove(&self, session: SessionId, request: &RequestId) {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&(session, request.clone()));
    }

    /// Drop every token owned by a session (session teardown).
    pub fn remove_session(&self, session: SessionId) {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|(owner, _), _| *owner != session);
    }

    /// Number of live tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether no tokens are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_fires_once() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel(Some("client gave up".into()));
        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some("client gave up"));
    }

    #[tokio::test]
    async fn cancelled_future_resolves() {
        let token = CancellationToken::new();
        let waiter = token.cancelled();
        token.cancel(None);
        waiter.await;
    }

    #[test]
    fn registry_scopes_by_session() {
        let registry = CancellationRegistry::new();
        let session_a = SessionId::new_v4();
        let session_b = SessionId::new_v4();
        let id = RequestId::String("12345".into());

        let token_a = registry.register(session_a, id.clone());
        let token_b = registry.register(session_b, id.clone());

        registry.cancel(session_a, &id, None);
        assert!(token_a.is_cancelled());
        assert!(!token_b.is_cancelled());
    }

    #[test]
    fn cancel_after_completion_is_a_no_op() {
        let registry = CancellationRegistry::new();
        let session = SessionId::new_v4();
        let id = RequestId::Number(7);

        let token = registry.register(session, id.clone());
        registry.remove(session, &id);
        registry.cancel(session, &id, None);
        assert!(!token.is_cancelled());
        assert!(registry.is_empty());
    }

    #[test]
    fn cancel_for_unknown_request_is_a_no_op() {
        let registry = CancellationRegistry::new();
        registry.cancel(SessionId::new_v4(), &RequestId::Number(1), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn session_teardown_drops_its_tokens() {
        let registry = CancellationRegistry::new();
        let session_a = SessionId::new_v4();
        let session_b = SessionId::new_v4();
        registry.register(session_a, RequestId::Number(1));
        registry.register(session_a, RequestId::Number(2));
        registry.register(session_b, RequestId::Number(1));

        registry.remove_session(session_a);
        assert_eq!(registry.len(), 1);
    }
}
