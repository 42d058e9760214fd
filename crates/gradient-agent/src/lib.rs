//! Gradient Agent
//!
//! A node of the Gradient mesh: gossips its health/load/capacity fields to
//! peers, aggregates theirs, and routes requests by field score.
//!
//! # HTTP surface
//!
//! ```text
//! GET  /health                   liveness
//! GET  /fields                   every known node's fields
//! GET  /fields/{node_id}         one node (zeros if unknown)
//! POST /state                    authoritative {node_id, health, load, capacity}
//! GET  /route?candidates=a,b,c   {"selected_node": ...}
//! GET  /config, POST /config     router weights and temperature
//! GET  /metrics                  decision counters (Prometheus text)
//! GET  /stream, GET /ws          dashboard field updates
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gradient_agent::{AgentConfig, AgentNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::from_env()?;
//!     let node = AgentNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod node;
pub mod ws;

pub use config::AgentConfig;
pub use error::{Error, Result};
pub use node::{AgentNode, AgentState};
