//! Standard I/O transport.
//!
//! The most common deployment for an MCP server: the client launches the
//! server as a subprocess and speaks newline-delimited JSON over
//! stdin/stdout. Logging must go to stderr; stdout belongs to the protocol.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::error::TransportError;
use crate::traits::Transport;

/// Maximum allowed frame size (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// A transport over the process's stdin/stdout.
///
/// Frames are single lines of JSON terminated by `\n`. Blank lines are
/// skipped.
pub struct StdioTransport {
    stdin: Mutex<BufReader<Stdin>>,
    stdout: Mutex<Stdout>,
    closed: AtomicBool,
}

impl StdioTransport {
    /// Create a transport over the process's standard streams.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
            stdout: Mutex::new(tokio::io::stdout()),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StdioTransport {
    async fn recv(&self) -> Result<Option<Bytes>, TransportError> {
        let mut stdin = self.stdin.lock().await;
        let mut buf = Vec::new();
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Ok(None);
            }
            buf.clear();
            let n = stdin.read_until(b'\n', &mut buf).await?;
            if n == 0 {
                return Ok(None); // EOF
            }
            if buf.len() > MAX_FRAME_SIZE {
                return Err(TransportError::FrameTooLarge {
                    size: buf.len(),
                    max: MAX_FRAME_SIZE,
                });
            }
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(Bytes::from(std::mem::take(&mut buf))));
        }
    }

    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(&frame).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        // A read blocked on stdin only unblocks at process EOF; the flag
        // stops any subsequent recv/send. Flush opportunistically: a send
        // in flight owns the lock and flushes on its own.
        self.closed.store(true, Ordering::Release);
        if let Ok(mut stdout) = self.stdout.try_lock() {
            stdout.flush().await?;
        }
        Ok(())
    }
}
