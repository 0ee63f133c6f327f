//! Resource-update subscriptions.
//!
//! Tracks which sessions subscribed to which URIs and fans
//! `notifications/resources/updated` out to them. Delivery is best-effort
//! and per-session: one failing push never blocks the rest and never
//! surfaces from [`SubscriptionManager::notify`].

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::session::{SessionId, SessionManager};

/// Per-URI subscriber sets.
#[derive(Default)]
pub struct SubscriptionManager {
    subscribers: RwLock<HashMap<String, HashSet<SessionId>>>,
}

impl SubscriptionManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a session to a URI.
    pub fn subscribe(&self, uri: impl Into<String>, session: SessionId) {
        self.subscribers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(uri.into())
            .or_default()
            .insert(session);
    }

    /// Unsubscribe a session from a URI.
    pub fn unsubscribe(&self, uri: &str, session: SessionId) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(set) = subscribers.get_mut(uri) {
            set.remove(&session);
            if set.is_empty() {
                subscribers.remove(uri);
            }
        }
    }

    /// Drop every subscription a session holds (session teardown).
    pub fn unsubscribe_all(&self, session: SessionId) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.retain(|_, set| {
            set.remove(&session);
            !set.is_empty()
        });
    }

    /// The sessions subscribed to a URI, as a snapshot.
    #[must_use]
    pub fn subscribers(&self, uri: &str) -> Vec<SessionId> {
        self.subscribers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(uri)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Emit `notifications/resources/updated` for a URI to every
    /// subscriber.
    ///
    /// Iterates a snapshot of the subscriber set; sessions that have
    /// vanished or whose push fails are skipped.
    pub fn notify(&self, uri: &str, payload: serde_json::Value, sessions: &SessionManager) {
        let params = serde_json::json!({
            "uri": uri,
            "content": payload,
        });
        for id in self.subscribers(uri) {
            let Some(session) = sessions.get(id) else {
                continue;
            };
            if let Err(err) = session.notify("notifications/resources/updated", Some(params.clone()))
            {
                tracing::debug!(
                    session_id = %id,
                    uri,
                    error = %err,
                    "resource update notification dropped"
                );
            }
        }
    }
}
