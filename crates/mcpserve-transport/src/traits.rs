//! Transport traits.
//!
//! The runtime core consumes framed byte streams and produces framed reply
//! byte streams; everything below the frame boundary (line delimiting,
//! socket handling) lives in this crate. A [`Transport`] is one connected
//! peer; a [`TransportListener`] accepts peers.

use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

/// One connected peer, exchanging opaque frames.
///
/// Implementations must be cheap to share across tasks: `recv` and `send`
/// take `&self`, and concurrent `send`s from multiple tasks must not
/// interleave bytes within a frame.
pub trait Transport: Send + Sync + 'static {
    /// Receive the next frame.
    ///
    /// Returns `Ok(None)` on clean end-of-stream. Frames are complete
    /// JSON-RPC messages; the transport strips its own delimiters.
    fn recv(&self) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;

    /// Send one frame to the peer.
    fn send(&self, frame: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the transport, unblocking any pending `recv`.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A listener accepting [`Transport`] peers.
pub trait TransportListener: Send + Sync + 'static {
    /// The peer type this listener produces.
    type Peer: Transport;

    /// Accept the next peer.
    ///
    /// Returns `Ok(None)` once the listener has been closed.
    fn accept(&self) -> impl Future<Output = Result<Option<Self::Peer>, TransportError>> + Send;

    /// Close the listener, unblocking any pending `accept`.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// The local address the listener is bound to, when meaningful.
    fn local_addr(&self) -> Option<String> {
        None
    }
}
