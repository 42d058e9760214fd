//! Error types for the agent.

use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while starting or running a node.
#[derive(Debug, Error)]
pub enum Error {
    /// An environment variable holds a value that cannot be used
    #[error("Invalid {var}={value:?}: {reason}")]
    Config {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// Gossip layer failed to start
    #[error("Gossip error: {0}")]
    Gossip(#[from] gradient_gossip::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
