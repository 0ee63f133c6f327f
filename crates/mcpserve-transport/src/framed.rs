//! Line-framed transport over any byte stream.
//!
//! Sockets (TCP, Unix) share this implementation: a
//! [`tokio_util::codec::LinesCodec`] on each half of the split stream, one
//! newline-delimited JSON message per line.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Notify};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::error::TransportError;
use crate::stdio::MAX_FRAME_SIZE;
use crate::traits::Transport;

/// A peer speaking newline-delimited frames over a split byte stream.
pub struct FramedPeer<R, W> {
    reader: Mutex<FramedRead<R, LinesCodec>>,
    writer: Mutex<FramedWrite<W, LinesCodec>>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl<R, W> FramedPeer<R, W>
where
    R: AsyncRead + Unpin + Send + Sync + 'static,
    W: AsyncWrite + Unpin + Send + Sync + 'static,
{
    /// Wrap the two halves of a connected stream.
    pub fn new(read_half: R, write_half: W) -> Self {
        let codec = || LinesCodec::new_with_max_length(MAX_FRAME_SIZE);
        Self {
            reader: Mutex::new(FramedRead::new(read_half, codec())),
            writer: Mutex::new(FramedWrite::new(write_half, codec())),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }
}

fn map_codec_error(err: LinesCodecError) -> TransportError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => TransportError::FrameTooLarge {
            size: MAX_FRAME_SIZE,
            max: MAX_FRAME_SIZE,
        },
        LinesCodecError::Io(io) => TransportError::Io(io),
    }
}

impl<R, W> Transport for FramedPeer<R, W>
where
    R: AsyncRead + Unpin + Send + Sync + 'static,
    W: AsyncWrite + Unpin + Send + Sync + 'static,
{
    async fn recv(&self) -> Result<Option<Bytes>, TransportError> {
        let notified = self.close_signal.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        let mut reader = self.reader.lock().await;
        loop {
            tokio::select! {
                item = reader.next() => match item {
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        return Ok(Some(Bytes::from(line.into_bytes())));
                    }
                    Some(Err(err)) => return Err(map_codec_error(err)),
                    None => return Ok(None),
                },
                () = &mut notified => return Ok(None),
            }
        }
    }

    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let line = String::from_utf8(frame.to_vec()).map_err(|_| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "frame is not valid UTF-8",
            ))
        })?;
        let mut writer = self.writer.lock().await;
        writer.send(line).await.map_err(map_codec_error)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        self.close_signal.notify_waiters();
        if let Ok(mut writer) = self.writer.try_lock() {
            let _ = futures::SinkExt::<String>::close(&mut *writer).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Transport;

    #[tokio::test]
    async fn frames_round_trip_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);
        let client = FramedPeer::new(client_read, client_write);
        let server = FramedPeer::new(server_read, server_write);

        client
            .send(Bytes::from_static(br#"{"jsonrpc":"2.0","method":"x"}"#))
            .await
            .unwrap();
        let frame = server.recv().await.unwrap().unwrap();
        assert_eq!(&frame[..], br#"{"jsonrpc":"2.0","method":"x"}"#);

        server.send(Bytes::from_static(b"reply")).await.unwrap();
        assert_eq!(&client.recv().await.unwrap().unwrap()[..], b"reply");
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let (client, server) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);
        let client = FramedPeer::new(client_read, client_write);
        let server = FramedPeer::new(server_read, server_write);

        client.send(Bytes::from_static(b"")).await.unwrap();
        client.send(Bytes::from_static(b"real")).await.unwrap();
        assert_eq!(&server.recv().await.unwrap().unwrap()[..], b"real");
    }

    #[tokio::test]
    async fn dropped_peer_reads_as_eof() {
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let server = FramedPeer::new(server_read, server_write);
        drop(client);
        assert!(server.recv().await.unwrap().is_none());
    }
}
