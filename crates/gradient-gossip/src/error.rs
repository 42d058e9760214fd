//! Error types for gradient-gossip.

use std::net::SocketAddr;
use thiserror::Error;

/// Result type for gossip operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gossip layer.
///
/// Only startup failures escape the protocol loops; everything on the data
/// path is logged and swallowed.
#[derive(Debug, Error)]
pub enum Error {
    /// The gossip socket could not be bound.
    #[error("failed to bind gossip socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Socket I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A datagram could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
