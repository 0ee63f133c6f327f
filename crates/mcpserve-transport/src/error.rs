//! Transport error types.

use thiserror::Error;

/// Errors produced by the transport layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The underlying I/O channel failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport is closed.
    #[error("transport is closed")]
    Closed,

    /// An incoming frame exceeded the configured size limit.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Observed frame size.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Binding or accepting on a listener failed.
    #[error("listener error: {0}")]
    Listener(String),
}

impl From<TransportError> for mcpserve_core::McpError {
    fn from(err: TransportError) -> Self {
        mcpserve_core::McpError::transport_with_source("transport failure", err)
    }
}
