//! Gossip configuration.

use gradient_fields::NodeId;
use std::net::SocketAddr;
use std::time::Duration;

/// Relay bound used when none is configured.
pub const DEFAULT_MAX_HOPS: u32 = 3;

/// Decay rate used when none is configured.
pub const DEFAULT_DECAY_RATE: f64 = 1.0;

/// Propagation tick.
pub const DEFAULT_GOSSIP_INTERVAL: Duration = Duration::from_millis(100);

/// Receive deadline; bounds how long shutdown can go unnoticed by the listener.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Receive buffer, and therefore the largest accepted datagram.
pub const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Gossip protocol configuration.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Local node id; messages from this origin are ignored
    pub node_id: NodeId,
    /// Peer addresses (`host:port`), resolved at send time
    pub peers: Vec<String>,
    /// UDP bind address
    pub bind: SocketAddr,
    /// Messages at or beyond this hop count are neither applied nor relayed
    pub max_hops: u32,
    /// Exponential decay rate per hop
    pub decay_rate: f64,
    /// Propagation period
    pub interval: Duration,
    /// Read deadline for the listen loop
    pub read_timeout: Duration,
    /// Kernel send buffer size in bytes
    pub sndbuf: usize,
    /// Kernel receive buffer size in bytes
    pub rcvbuf: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            peers: Vec::new(),
            bind: SocketAddr::from(([0, 0, 0, 0], 7946)),
            max_hops: DEFAULT_MAX_HOPS,
            decay_rate: DEFAULT_DECAY_RATE,
            interval: DEFAULT_GOSSIP_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            sndbuf: 1024 * 1024,
            rcvbuf: 1024 * 1024,
        }
    }
}

impl GossipConfig {
    /// Create a config for `node_id` bound to `bind`, gossiping with `peers`.
    pub fn new(node_id: impl Into<NodeId>, bind: SocketAddr, peers: Vec<String>) -> Self {
        Self {
            node_id: node_id.into(),
            bind,
            peers,
            ..Default::default()
        }
    }

    /// Replace zero values with defaults and drop blank peer entries.
    pub fn normalized(mut self) -> Self {
        if self.max_hops == 0 {
            self.max_hops = DEFAULT_MAX_HOPS;
        }
        if self.decay_rate == 0.0 {
            self.decay_rate = DEFAULT_DECAY_RATE;
        }
        if self.interval.is_zero() {
            self.interval = DEFAULT_GOSSIP_INTERVAL;
        }
        if self.read_timeout.is_zero() {
            self.read_timeout = DEFAULT_READ_TIMEOUT;
        }
        self.peers = self
            .peers
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_fills_zero_values() {
        let cfg = GossipConfig {
            max_hops: 0,
            decay_rate: 0.0,
            interval: Duration::ZERO,
            read_timeout: Duration::ZERO,
            peers: vec![" 10.0.0.2:7946 ".into(), "".into(), "  ".into(), "peer:7946".into()],
            ..Default::default()
        }
        .normalized();

        assert_eq!(cfg.max_hops, DEFAULT_MAX_HOPS);
        assert_eq!(cfg.decay_rate, DEFAULT_DECAY_RATE);
        assert_eq!(cfg.interval, DEFAULT_GOSSIP_INTERVAL);
        assert_eq!(cfg.read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(cfg.peers, vec!["10.0.0.2:7946".to_string(), "peer:7946".to_string()]);
    }

    #[test]
    fn normalized_keeps_explicit_values() {
        let cfg = GossipConfig {
            max_hops: 5,
            decay_rate: 0.5,
            ..Default::default()
        }
        .normalized();
        assert_eq!(cfg.max_hops, 5);
        assert_eq!(cfg.decay_rate, 0.5);
    }
}
