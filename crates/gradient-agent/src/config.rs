//! Node configuration from the environment.

use crate::error::{Error, Result};
use gradient_fields::{NodeId, DEFAULT_MAX_CONNECTIONS};
use gradient_gossip::{GossipConfig, DEFAULT_DECAY_RATE, DEFAULT_GOSSIP_INTERVAL, DEFAULT_MAX_HOPS};
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a Gradient node.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Local node id
    pub node_id: NodeId,

    /// Administration surface port
    pub http_port: u16,

    /// UDP gossip port, bound on all interfaces
    pub gossip_port: u16,

    /// Gossip peers (`host:port`)
    pub peers: Vec<String>,

    pub max_hops: u32,
    pub decay_rate: f64,
    pub gossip_interval: Duration,

    /// Connection count the emitter treats as saturation
    pub max_connections: u32,

    /// Attach the synthetic jitter metrics source
    pub synthetic_metrics: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            http_port: 8081,
            gossip_port: 7946,
            peers: Vec::new(),
            max_hops: DEFAULT_MAX_HOPS,
            decay_rate: DEFAULT_DECAY_RATE,
            gossip_interval: DEFAULT_GOSSIP_INTERVAL,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            synthetic_metrics: true,
        }
    }
}

impl AgentConfig {
    /// Create config from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let node_id = get("NODE_ID").unwrap_or(defaults.node_id);
        let peers = get("PEERS")
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let gossip_interval_ms = parse_var(
            get("GOSSIP_INTERVAL_MS"),
            "GOSSIP_INTERVAL_MS",
            defaults.gossip_interval.as_millis() as u64,
        )?;

        let decay_rate: f64 = parse_var(get("DECAY_RATE"), "DECAY_RATE", defaults.decay_rate)?;
        if !decay_rate.is_finite() || decay_rate < 0.0 {
            return Err(Error::Config {
                var: "DECAY_RATE",
                value: decay_rate.to_string(),
                reason: "must be finite and non-negative".into(),
            });
        }

        Ok(Self {
            node_id,
            http_port: parse_var(get("HTTP_PORT"), "HTTP_PORT", defaults.http_port)?,
            gossip_port: parse_var(get("GOSSIP_PORT"), "GOSSIP_PORT", defaults.gossip_port)?,
            peers,
            max_hops: parse_var(get("MAX_HOPS"), "MAX_HOPS", defaults.max_hops)?,
            decay_rate,
            gossip_interval: Duration::from_millis(gossip_interval_ms),
            max_connections: parse_var(
                get("MAX_CONNECTIONS"),
                "MAX_CONNECTIONS",
                defaults.max_connections,
            )?,
            synthetic_metrics: parse_flag(get("SYNTHETIC_METRICS"), "SYNTHETIC_METRICS", true)?,
        })
    }

    /// HTTP listen address.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.http_port))
    }

    /// Gossip bind address.
    pub fn gossip_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.gossip_port))
    }

    /// Gossip protocol settings derived from this config.
    pub fn gossip_config(&self) -> GossipConfig {
        GossipConfig {
            max_hops: self.max_hops,
            decay_rate: self.decay_rate,
            interval: self.gossip_interval,
            ..GossipConfig::new(self.node_id.clone(), self.gossip_addr(), self.peers.clone())
        }
    }
}

fn parse_var<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| Error::Config {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_flag(raw: Option<String>, var: &'static str, default: bool) -> Result<bool> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config {
            var,
            value,
            reason: "expected true or false".into(),
        }),
    }
}
