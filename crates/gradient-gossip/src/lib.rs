//! Gradient Gossip - Epidemic Field Dissemination
//!
//! Each node broadcasts its own fields to every configured peer on a fixed
//! tick and relays what it hears, attenuated by distance, until a hop limit.
//!
//! # Design Philosophy
//!
//! This is best-effort epidemic dissemination, not reliable broadcast:
//!
//! - no acknowledgment, retry or ordering guarantee
//! - no de-duplication; a message may arrive many times by many paths
//! - loss and duplication only change convergence speed, never correctness
//!
//! # Relay Rule
//!
//! ```text
//! on receive(msg):
//!     if msg.origin == self or msg.hops >= max_hops: drop
//!     for each field f in msg:
//!         store[msg.origin][f] = f.intensity * e^(-decay_rate * (msg.hops + 1))
//!     msg.hops += 1
//!     broadcast(msg) to all peers
//! ```
//!
//! Attribution stays with the true origin, never the relaying peer. The
//! exponential term encodes confidence falling off with distance.
//!
//! # Example
//!
//! ```rust,ignore
//! use gradient_gossip::{GossipConfig, GossipProtocol};
//!
//! let protocol = GossipProtocol::bind(config, emitter, store)?;
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let handle = protocol.spawn(shutdown_rx);
//! // ...
//! shutdown_tx.send(true)?;
//! handle.await?;
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod protocol;
pub mod transport;

pub use config::{
    GossipConfig, DEFAULT_DECAY_RATE, DEFAULT_GOSSIP_INTERVAL, DEFAULT_MAX_HOPS,
    DEFAULT_READ_TIMEOUT, RECV_BUFFER_SIZE,
};
pub use error::{Error, Result};
pub use message::GossipMessage;
pub use protocol::{decayed_intensity, DropReason, GossipProtocol, Ingest, ProtocolState};
pub use transport::GossipTransport;
