//! TCP transport.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Notify;

use crate::error::TransportError;
use crate::framed::FramedPeer;
use crate::traits::TransportListener;

/// A connected TCP peer.
pub type TcpTransport = FramedPeer<OwnedReadHalf, OwnedWriteHalf>;

/// A TCP listener producing line-framed peers.
pub struct TcpTransportListener {
    listener: TcpListener,
    local_addr: Option<String>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl TcpTransportListener {
    /// Bind to the given address.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr().ok().map(|a| a.to_string());
        Ok(Self {
            listener,
            local_addr,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        })
    }
}

impl TransportListener for TcpTransportListener {
    type Peer = TcpTransport;

    async fn accept(&self) -> Result<Option<Self::Peer>, TransportError> {
        let notified = self.close_signal.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        tokio::select! {
            accepted = self.listener.accept() => {
                let (stream, peer_addr) = accepted?;
                tracing::debug!(peer = %peer_addr, "accepted tcp peer");
                let (read_half, write_half) = stream.into_split();
                Ok(Some(FramedPeer::new(read_half, write_half)))
            }
            () = &mut notified => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        self.close_signal.notify_waiters();
        Ok(())
    }

    fn local_addr(&self) -> Option<String> {
        self.local_addr.clone()
    }
}
