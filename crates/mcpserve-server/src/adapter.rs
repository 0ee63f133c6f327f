//! Transport adapter: bridges framed transports to the dispatcher.
//!
//! One session per peer. The read loop pulls frames until EOF or shutdown:
//!
//! - **Notifications and responses** are handled inline on the read task,
//!   which is what guarantees a `notifications/cancelled` reaches the
//!   cancellation registry before any later request from the same peer is
//!   dispatched.
//! - **Requests** each run on their own task, so a slow tool call never
//!   blocks the peer's next frame. Responses preserve request-id identity,
//!   not arrival order.
//!
//! All outbound frames — handler notifications, server→client sampling
//! requests, and responses — funnel through one ordered channel drained by
//! a single writer task, so a handler can push while the reader is blocked
//! and its notifications are flushed before its response.
//!
//! A peer's I/O error tears down only that peer's session: subscriptions
//! are dropped, cancellation entries cleared, sampling counters released.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use mcpserve_core::error::{JsonRpcError, McpError};
use mcpserve_core::protocol::{Message, Response};
use mcpserve_transport::{Transport, TransportListener};

use crate::dispatcher::Dispatcher;
use crate::session::SendFrame;

/// Serve a single connected peer until EOF, error, or shutdown.
///
/// Used directly for single-peer transports (stdio) and per accepted peer
/// by [`serve_listener`].
pub async fn serve_peer<T: Transport>(
    dispatcher: Arc<Dispatcher>,
    transport: Arc<T>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();

    // Writer task: the sole path to the transport's send side.
    let writer = {
        let transport = transport.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(err) = transport.send(frame).await {
                    tracing::debug!(error = %err, "peer write failed, stopping writer");
                    break;
                }
            }
        })
    };

    let send: SendFrame = {
        let outbound_tx = outbound_tx.clone();
        Arc::new(move |frame| {
            outbound_tx
                .send(frame)
                .map_err(|_| McpError::transport("peer outbound channel is closed"))
        })
    };
    let session = dispatcher.sessions().create(send);
    let session_id = session.id();
    tracing::debug!(session_id = %session_id, "peer connected");

    let mut requests: JoinSet<()> = JoinSet::new();

    // The server may have been closed before this peer was handed over.
    while !*shutdown.borrow() {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = transport.recv() => {
                let frame = match received {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        tracing::debug!(session_id = %session_id, "peer disconnected");
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %err,
                            "peer read failed"
                        );
                        break;
                    }
                };

                match Message::decode(&frame) {
                    Ok(Message::Request(request)) => {
                        // Seed the cancellation token inline so a
                        // cancellation decoded after this frame can never
                        // race ahead of the spawned handler.
                        dispatcher
                            .cancellations()
                            .register(session_id, request.id.clone());
                        let dispatcher = dispatcher.clone();
                        let session = session.clone();
                        let outbound = outbound_tx.clone();
                        requests.spawn(async move {
                            let request_id = request.id.clone();
                            let response =
                                dispatcher.handle_request(&session, request).await;
                            dispatcher.cancellations().remove(session.id(), &request_id);
                            if let Ok(encoded) = Message::Response(response).encode() {
                                let _ = outbound.send(Bytes::from(encoded));
                            }
                        });
                    }
                    Ok(Message::Notification(notification)) => {
                        dispatcher.handle_notification(&session, &notification);
                    }
                    Ok(Message::Response(response)) => {
                        dispatcher.handle_response(&session, response);
                    }
                    Err(envelope) => {
                        // Malformed frame: answer when the id is
                        // recoverable, otherwise discard. Never fatal.
                        if let Some(id) = envelope.id {
                            let response =
                                Response::error(id, JsonRpcError::from(&envelope.error));
                            if let Ok(encoded) = Message::Response(response).encode() {
                                let _ = outbound_tx.send(Bytes::from(encoded));
                            }
                        } else {
                            tracing::debug!(
                                session_id = %session_id,
                                error = %envelope.error,
                                "discarding malformed frame"
                            );
                        }
                    }
                }
            }
        }
    }

    // The peer is gone (or the server is stopping): abort in-flight
    // request tasks rather than leak them.
    requests.shutdown().await;

    dispatcher.teardown_session(session_id);
    let _ = transport.close().await;

    drop(outbound_tx);
    let _ = writer.await;
    tracing::debug!(session_id = %session_id, "peer torn down");
}

/// Accept peers from a listener until shutdown, serving each concurrently.
pub async fn serve_listener<L: TransportListener>(
    dispatcher: Arc<Dispatcher>,
    listener: L,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), McpError> {
    if let Some(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "listening");
    }

    let mut peers: JoinSet<()> = JoinSet::new();
    while !*shutdown.borrow() {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok(Some(peer)) => {
                        peers.spawn(serve_peer(
                            dispatcher.clone(),
                            Arc::new(peer),
                            shutdown.clone(),
                        ));
                    }
                    Ok(None) => break,
                    Err(err) => {
                        return Err(McpError::transport_with_source("accept failed", err));
                    }
                }
            }
        }
    }

    listener
        .close()
        .await
        .map_err(|err| McpError::transport_with_source("listener close failed", err))?;

    // Peers observe the same shutdown signal; wait for their teardown.
    while peers.join_next().await.is_some() {}
    Ok(())
}
