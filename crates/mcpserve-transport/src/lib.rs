//! Framed byte-stream transports for the mcpserve runtime.
//!
//! The dispatcher consumes complete JSON-RPC frames and produces complete
//! reply frames; this crate owns everything below that boundary. All
//! transports here speak newline-delimited JSON.
//!
//! | Transport | Use case |
//! |-----------|----------|
//! | [`StdioTransport`] | Subprocess servers (the common MCP deployment) |
//! | [`TcpTransportListener`] | TCP servers |
//! | [`UnixTransportListener`] | Local IPC (Unix platforms) |
//! | [`MemoryTransport`] | Tests and in-process wiring |
//!
//! # Example
//!
//! ```rust
//! use mcpserve_transport::{MemoryTransport, Transport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (client, server) = MemoryTransport::pair();
//! client.send(bytes::Bytes::from_static(b"{}")).await.unwrap();
//! assert!(server.recv().await.unwrap().is_some());
//! # }
//! ```

pub mod error;
pub mod framed;
pub mod memory;
pub mod stdio;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod unix;

pub use error::TransportError;
pub use framed::FramedPeer;
pub use memory::MemoryTransport;
pub use stdio::{StdioTransport, MAX_FRAME_SIZE};
pub use tcp::{TcpTransport, TcpTransportListener};
pub use traits::{Transport, TransportListener};

#[cfg(unix)]
pub use unix::{UnixTransport, UnixTransportListener};

// Re-export the frame currency so downstream crates don't need a direct
// bytes dependency for casual use.
pub use bytes::Bytes;
