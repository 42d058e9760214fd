//! Field stream for dashboards.
//!
//! `GET /stream` returns one [`StreamEvent::FieldUpdate`]; `GET /ws` pushes the
//! same payload once per second until the client goes away.
//!
//! ```json
//! {
//!   "type": "field_update",
//!   "nodes": [{"id": "node-1", "x": 150, "y": 220, "health": 0.9, ..., "condition": "healthy"}],
//!   "fields": {"node-1": {"node-1": 0.0, "node-2": 0.41}}
//! }
//! ```

use crate::node::AgentState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use gradient_fields::LocalFieldState;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Push period for WebSocket clients.
pub const PUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Events sent to stream consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Every known node plus the pairwise field gradient between them
    FieldUpdate {
        nodes: Vec<NodeView>,
        fields: BTreeMap<String, BTreeMap<String, f64>>,
    },
}

/// One node as drawn by a dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub health: f64,
    pub load: f64,
    pub capacity: f64,
    pub requests_per_second: f64,
    pub error_rate: f64,
    pub latency_p99: f64,
    pub condition: NodeCondition,
}

/// Coarse node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCondition {
    Healthy,
    Recovering,
    Degraded,
    Critical,
}

impl NodeCondition {
    pub fn classify(health: f64, load: f64, error_rate: f64) -> Self {
        if health < 0.5 || error_rate > 0.1 || load > 0.9 {
            Self::Critical
        } else if health < 0.72 || error_rate > 0.05 || load > 0.78 {
            Self::Degraded
        } else if health < 0.82 || error_rate > 0.025 {
            Self::Recovering
        } else {
            Self::Healthy
        }
    }
}

impl NodeView {
    fn new(index: usize, state: &LocalFieldState) -> Self {
        let error_rate = 1.0 - state.health;
        Self {
            id: state.node_id.clone(),
            x: 150 + 220 * index as u32,
            y: 220,
            health: state.health,
            load: state.load,
            capacity: state.capacity,
            requests_per_second: 80.0,
            error_rate,
            latency_p99: 1000.0 * (1.0 - state.health),
            condition: NodeCondition::classify(state.health, state.load, error_rate),
        }
    }
}

/// Pull from `source` toward `target`: target headroom minus the source's
/// unhealthy load.
pub fn gradient(source: &LocalFieldState, target: &LocalFieldState) -> f64 {
    (target.capacity - target.load) - source.load * (1.0 - source.health)
}

/// Build the current field update from the store snapshot.
pub fn field_update(state: &AgentState) -> StreamEvent {
    let snapshot = state.store.snapshot();

    let nodes = snapshot
        .values()
        .enumerate()
        .map(|(i, s)| NodeView::new(i, s))
        .collect();

    let fields = snapshot
        .iter()
        .map(|(source_id, source)| {
            let row = snapshot
                .iter()
                .map(|(target_id, target)| {
                    let g = if source_id == target_id {
                        0.0
                    } else {
                        gradient(source, target)
                    };
                    (target_id.clone(), g)
                })
                .collect();
            (source_id.clone(), row)
        })
        .collect();

    StreamEvent::FieldUpdate { nodes, fields }
}

/// WebSocket handler for field updates
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AgentState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AgentState>) {
    info!("WebSocket client connected for field updates");

    let (mut sender, mut receiver) = socket.split();
    let mut interval = tokio::time::interval(PUSH_INTERVAL);

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(other)) => {
                        // Pings are answered by the protocol layer
                        debug!("Ignoring client message: {:?}", other);
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            _ = interval.tick() => {
                if let Err(e) = send_event(&mut sender, &field_update(&state)).await {
                    warn!("Failed to send field update: {}", e);
                    break;
                }
            }
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &StreamEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
