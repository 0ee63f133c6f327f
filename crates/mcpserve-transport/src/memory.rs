//! In-memory transport for testing.
//!
//! [`MemoryTransport::pair`] returns two connected ends; frames sent on one
//! are received on the other. This is the transport the integration tests
//! drive the runtime through.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use mcpserve_transport::{MemoryTransport, Transport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (client, server) = MemoryTransport::pair();
//! client.send(Bytes::from_static(b"{}")).await.unwrap();
//! let frame = server.recv().await.unwrap().unwrap();
//! assert_eq!(&frame[..], b"{}");
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as SyncMutex;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::{Mutex, Notify};

use crate::error::TransportError;
use crate::traits::Transport;

/// Default channel capacity for a memory pair.
const DEFAULT_CAPACITY: usize = 32;

/// One end of an in-memory transport pair.
pub struct MemoryTransport {
    // Sync lock: the sender is cloned out before awaiting, so a blocked
    // send can never hold the lock against close().
    sender: SyncMutex<Option<mpsc::Sender<Bytes>>>,
    receiver: Mutex<mpsc::Receiver<Bytes>>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl MemoryTransport {
    /// Create a connected pair of transports.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        Self::pair_with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a connected pair with a specific buffer capacity.
    #[must_use]
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        let (tx1, rx1) = mpsc::channel(capacity);
        let (tx2, rx2) = mpsc::channel(capacity);

        let a = Self {
            sender: SyncMutex::new(Some(tx2)),
            receiver: Mutex::new(rx1),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        };
        let b = Self {
            sender: SyncMutex::new(Some(tx1)),
            receiver: Mutex::new(rx2),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        };
        (a, b)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Transport for MemoryTransport {
    async fn recv(&self) -> Result<Option<Bytes>, TransportError> {
        // Register interest in the close signal before checking the flag,
        // so a close racing this call cannot slip between check and wait.
        let notified = self.close_signal.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_closed() {
            return Ok(None);
        }
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            frame = receiver.recv() => Ok(frame),
            () = &mut notified => Ok(None),
        }
    }

    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            return Err(TransportError::Closed);
        };
        sender
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        // Dropping the sender lets the peer's recv drain to EOF; the notify
        // unblocks our own pending recv.
        self.sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        self.close_signal.notify_waiters();
        Ok(())
    }
}
