//! Harness for running several gossip nodes on loopback.
//!
//! Each [`TestNode`] owns its own store and UDP socket on `127.0.0.1:0`.
//! Topologies are wired by binding downstream nodes first so their addresses
//! can be handed to upstream peers.

use gradient_fields::{Emitter, EmitterConfig, MetricSource, StateStore};
use gradient_gossip::{GossipConfig, GossipProtocol, ProtocolState, Result};
use gradient_metrics::{JitterMetrics, MetricsSample};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Metrics that emit health 1.0, load 0.5, capacity 0.5.
pub fn steady_metrics() -> Arc<dyn MetricSource> {
    Arc::new(JitterMetrics::with_sample(MetricsSample {
        error_rate: 0.0,
        latency_p99_ms: 0.0,
        cpu: 0.5,
        memory: 0.5,
        connections: 50,
    }))
}

/// One running gossip node.
pub struct TestNode {
    pub id: String,
    pub store: Arc<StateStore>,
    pub protocol: Arc<GossipProtocol>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

/// Options for a node in a test topology.
#[derive(Clone)]
pub struct NodeSpec {
    pub id: String,
    pub metrics: Option<Arc<dyn MetricSource>>,
    pub max_hops: u32,
    pub decay_rate: f64,
    pub interval: Duration,
}

impl NodeSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            metrics: None,
            max_hops: 3,
            decay_rate: 1.0,
            interval: Duration::from_millis(50),
        }
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricSource>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }
}

impl TestNode {
    /// Bind and start a node gossiping to `peers`.
    pub fn start(spec: NodeSpec, peers: &[SocketAddr]) -> Result<Self> {
        let store = Arc::new(StateStore::new(spec.id.clone()));
        let emitter = Emitter::new(spec.id.clone(), spec.metrics, EmitterConfig::default());

        let mut config = GossipConfig::new(
            spec.id.clone(),
            SocketAddr::from(([127, 0, 0, 1], 0)),
            peers.iter().map(|p| p.to_string()).collect(),
        );
        config.max_hops = spec.max_hops;
        config.decay_rate = spec.decay_rate;
        config.interval = spec.interval;
        config.read_timeout = Duration::from_millis(50);

        let protocol = GossipProtocol::bind(config, emitter, store.clone())?;
        let (shutdown, rx) = watch::channel(false);
        let task = protocol.spawn(rx);

        Ok(Self {
            id: spec.id,
            store,
            protocol,
            shutdown,
            task: Some(task),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        self.protocol.local_addr()
    }

    /// Signal shutdown and wait for the loops to finish.
    pub async fn stop(mut self) -> ProtocolState {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.protocol.state()
    }
}

/// Start a linear chain `specs[0] -> specs[1] -> ...`, where each node only
/// knows the next one. Returned in the same order as `specs`.
pub fn start_chain(specs: Vec<NodeSpec>) -> Result<Vec<TestNode>> {
    let mut nodes: Vec<TestNode> = Vec::with_capacity(specs.len());
    for spec in specs.into_iter().rev() {
        let peers = match nodes.last() {
            Some(next) => vec![next.addr()?],
            None => Vec::new(),
        };
        nodes.push(TestNode::start(spec, &peers)?);
    }
    nodes.reverse();
    Ok(nodes)
}

/// Poll `check` every 20ms until it holds or `timeout` passes.
pub async fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
