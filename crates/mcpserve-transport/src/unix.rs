//! Unix domain socket transport.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixListener;
use tokio::sync::Notify;

use crate::error::TransportError;
use crate::framed::FramedPeer;
use crate::traits::TransportListener;

/// A connected Unix-socket peer.
pub type UnixTransport = FramedPeer<OwnedReadHalf, OwnedWriteHalf>;

/// A Unix-socket listener producing line-framed peers.
pub struct UnixTransportListener {
    listener: UnixListener,
    path: String,
    closed: AtomicBool,
    close_signal: Notify,
}

impl UnixTransportListener {
    /// Bind to the given socket path, removing a stale socket file first.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self {
            listener,
            path: path.display().to_string(),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        })
    }
}

impl TransportListener for UnixTransportListener {
    type Peer = UnixTransport;

    async fn accept(&self) -> Result<Option<Self::Peer>, TransportError> {
        let notified = self.close_signal.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        tokio::select! {
            accepted = self.listener.accept() => {
                let (stream, _addr) = accepted?;
                let (read_half, write_half) = stream.into_split();
                Ok(Some(FramedPeer::new(read_half, write_half)))
            }
            () = &mut notified => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        self.close_signal.notify_waiters();
        let _ = std::fs::remove_file(&self.path);
        Ok(())
    }

    fn local_addr(&self) -> Option<String> {
        Some(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Transport;
    use bytes::Bytes;

    #[tokio::test]
    async fn accepts_and_exchanges_frames() {
        let dir = std::env::temp_dir().join(format!("mcpserve-unix-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let socket = dir.join("t.sock");

        let listener = UnixTransportListener::bind(&socket).unwrap();

        let client_path = socket.clone();
        let client = tokio::spawn(async move {
            let stream = tokio::net::UnixStream::connect(client_path).await.unwrap();
            let (read_half, write_half) = stream.into_split();
            let peer = FramedPeer::new(read_half, write_half);
            peer.send(Bytes::from_static(b"ping")).await.unwrap();
            peer.recv().await.unwrap().unwrap()
        });

        let peer = listener.accept().await.unwrap().unwrap();
        assert_eq!(&peer.recv().await.unwrap().unwrap()[..], b"ping");
        peer.send(Bytes::from_static(b"pong")).await.unwrap();
        assert_eq!(&client.await.unwrap()[..], b"pong");

        listener.close().await.unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }
}
