//! Gradient node - wires the field store, gossip, router and HTTP surface.
//!
//! Architecture:
//! - One shared state store written by gossip and by `POST /state`
//! - Gossip loops on their own task, synthetic metrics on another
//! - HTTP server in the foreground until a shutdown signal
//!
//! Shutdown flips a shared `watch` flag; every loop exits on its next tick or
//! read deadline, and `run` returns once gossip reports `Stopped`.

use crate::api;
use crate::config::AgentConfig;
use crate::error::Result;
use gradient_decision::Router;
use gradient_fields::{Emitter, EmitterConfig, MetricSource, NodeId, StateStore};
use gradient_gossip::{GossipProtocol, ProtocolState};
use gradient_metrics::{DecisionCounter, JitterMetrics};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct AgentState {
    pub node_id: NodeId,
    pub store: Arc<StateStore>,
    pub router: Router,
    pub counter: DecisionCounter,
}

impl AgentState {
    /// Fresh state with an empty store and default router weights.
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        let node_id = node_id.into();
        let store = Arc::new(StateStore::new(node_id.clone()));
        Self {
            router: Router::new(store.clone()),
            counter: DecisionCounter::new(),
            store,
            node_id,
        }
    }
}

/// A Gradient node instance.
pub struct AgentNode {
    config: AgentConfig,
    state: Arc<AgentState>,
    gossip: Arc<GossipProtocol>,
    metrics: Option<Arc<JitterMetrics>>,
}

impl AgentNode {
    /// Build the node and bind the gossip socket. Must be called inside a
    /// Tokio runtime.
    pub async fn new(config: AgentConfig) -> Result<Self> {
        let state = Arc::new(AgentState::new(config.node_id.clone()));

        let metrics = config.synthetic_metrics.then(|| Arc::new(JitterMetrics::new()));
        let source = metrics
            .clone()
            .map(|m| m as Arc<dyn MetricSource>);
        let emitter = Emitter::new(
            config.node_id.clone(),
            source,
            EmitterConfig {
                max_connections: config.max_connections,
            },
        );

        let gossip = GossipProtocol::bind(config.gossip_config(), emitter, state.store.clone())?;

        Ok(Self {
            config,
            state,
            gossip,
            metrics,
        })
    }

    /// Shared handler state.
    pub fn state(&self) -> Arc<AgentState> {
        Arc::clone(&self.state)
    }

    /// Gossip protocol handle.
    pub fn gossip(&self) -> Arc<GossipProtocol> {
        Arc::clone(&self.gossip)
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
    }

    /// Run until `signal` resolves, then stop every loop and wait for gossip
    /// to reach `Stopped`.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Gradient node {} starting", self.config.node_id);
        info!("  HTTP:   http://{}", self.config.http_addr());
        info!("  Gossip: {}", self.gossip.local_addr()?);
        info!("  Peers:  {:?}", self.config.peers);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut gossip_state = self.gossip.subscribe_state();
        let gossip_task = self.gossip.spawn(shutdown_rx.clone());

        if let Some(metrics) = self.metrics.clone() {
            let rx = shutdown_rx.clone();
            tokio::spawn(async move { metrics.run(rx).await });
        }

        let app = api::build_router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(self.config.http_addr()).await?;
        info!("HTTP server listening on {}", listener.local_addr()?);

        let mut server_rx = shutdown_rx.clone();
        let trigger = shutdown_tx.clone();
        tokio::spawn(async move {
            signal.await;
            info!("Shutdown requested");
            trigger.send_replace(true);
        });

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_rx.wait_for(|stop| *stop).await;
            })
            .await;

        // Server errors still tear down the background loops.
        shutdown_tx.send_replace(true);
        if gossip_state
            .wait_for(|s| *s == ProtocolState::Stopped)
            .await
            .is_err()
        {
            warn!("Gossip state channel closed before Stopped");
        }
        if let Err(e) = gossip_task.await {
            error!("Gossip task failed: {}", e);
        }

        info!("Gradient node {} stopped", self.config.node_id);
        served?;
        Ok(())
    }
}
