//! Gossip protocol: propagation loop, listen loop and relay algorithm.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run()──> Running ──shutdown / both loops exit──> Stopped
//! ```
//!
//! There is no reconnect state. A receive error ends that read attempt only;
//! the listen loop carries on.
//!
//! # Loops
//!
//! - **Propagation**: every tick, re-run the emitter, upsert the result as the
//!   local node's fields, and announce it (`hops = 0`) to every peer.
//! - **Listen**: receive with a read deadline so shutdown is noticed between
//!   reads; decode, then hand to [`GossipProtocol::handle_incoming`].
//!   Undecodable payloads are dropped.
//!
//! Both loops share the state store through its own lock and nothing else.
//! Shutdown is cooperative: it is polled at each tick and each read deadline,
//! with no flush of in-flight sends.

use crate::config::{GossipConfig, RECV_BUFFER_SIZE};
use crate::error::Result;
use crate::message::GossipMessage;
use crate::transport::{GossipTransport, Recv};
use gradient_fields::{Emitter, FieldType, StateStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

/// Attenuate `original` by `e^(-decay_rate * hops)`.
///
/// `hops = 0` returns `original` unchanged; for `decay_rate > 0` the result
/// strictly decreases with `hops`.
pub fn decayed_intensity(original: f64, hops: u32, decay_rate: f64) -> f64 {
    original * (-decay_rate * f64::from(hops)).exp()
}

/// Protocol lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Bound, loops not started
    Idle,
    /// Propagation and listen loops active
    Running,
    /// Loops have exited
    Stopped,
}

/// Why an incoming message was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The message originated at this node
    OwnOrigin,
    /// The message already travelled `max_hops` relays
    HopLimit,
}

/// Result of applying an incoming message to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    /// No mutation, no relay
    Dropped(DropReason),
    /// `applied` fields were written; `message` (hop count already
    /// incremented) is to be re-broadcast
    Relay {
        applied: usize,
        message: GossipMessage,
    },
}

/// Field gossip endpoint of one node.
pub struct GossipProtocol {
    config: GossipConfig,
    emitter: Emitter,
    store: Arc<StateStore>,
    transport: GossipTransport,
    state: watch::Sender<ProtocolState>,
}

impl std::fmt::Debug for GossipProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipProtocol")
            .field("node_id", &self.config.node_id)
            .field("bind", &self.config.bind)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    // A dropped sender counts as shutdown.
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

impl GossipProtocol {
    /// Bind the gossip socket. A bind failure is fatal to the caller.
    pub fn bind(config: GossipConfig, emitter: Emitter, store: Arc<StateStore>) -> Result<Arc<Self>> {
        let config = config.normalized();
        let transport = GossipTransport::bind(config.bind, config.sndbuf, config.rcvbuf)?
            .with_resolve_timeout(config.read_timeout);
        let (state, _) = watch::channel(ProtocolState::Idle);

        info!(
            "Gossip protocol for {} ready (peers={}, max_hops={}, decay_rate={})",
            config.node_id,
            config.peers.len(),
            config.max_hops,
            config.decay_rate
        );

        Ok(Arc::new(Self {
            config,
            emitter,
            store,
            transport,
            state,
        }))
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Address the gossip socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProtocolState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ProtocolState> {
        self.state.subscribe()
    }

    /// Run both loops on a background task.
    pub fn spawn(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let protocol = Arc::clone(self);
        tokio::spawn(async move { protocol.run(shutdown).await })
    }

    /// Run the propagation and listen loops until shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        self.state.send_replace(ProtocolState::Running);
        info!("Gossip running on {}", self.config.bind);

        tokio::join!(
            self.propagation_loop(shutdown.clone()),
            self.listen_loop(shutdown)
        );

        self.state.send_replace(ProtocolState::Stopped);
        info!("Gossip stopped for {}", self.config.node_id);
    }

    async fn propagation_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if shutdown_requested(&shutdown) {
                        break;
                    }
                    self.propagate_once().await;
                }
            }
        }
        debug!("Propagation loop exited");
    }

    /// One propagation tick: emit, store locally, announce to every peer.
    ///
    /// Returns the number of peers the announcement was sent to.
    pub async fn propagate_once(&self) -> usize {
        let local = self.emitter.emit_all();
        self.store.set_local(&local);

        let msg = GossipMessage::announce(self.config.node_id.clone(), &local);
        self.broadcast(&msg).await
    }

    async fn listen_loop(&self, shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        while !shutdown_requested(&shutdown) {
            match self
                .transport
                .recv_timeout(&mut buf, self.config.read_timeout)
                .await
            {
                Ok(Recv::TimedOut) => continue,
                Ok(Recv::Datagram { len, from }) => {
                    trace!("Gossip recv {} bytes from {}", len, from);
                    match GossipMessage::decode(&buf[..len]) {
                        Ok(msg) => {
                            self.handle_incoming(msg).await;
                        }
                        Err(e) => debug!("Dropping malformed gossip from {}: {}", from, e),
                    }
                }
                Err(e) => debug!("Gossip recv error: {}", e),
            }
        }
        debug!("Listen loop exited");
    }

    /// Apply an incoming message to the store and relay it if allowed.
    pub async fn handle_incoming(&self, msg: GossipMessage) -> Ingest {
        let outcome = self.ingest(msg);
        if let Ingest::Relay { message, .. } = &outcome {
            self.broadcast(message).await;
        }
        outcome
    }

    /// The relay rule without the network side.
    ///
    /// Messages from ourselves or at the hop limit are dropped untouched.
    /// Otherwise each known field is decayed by distance `hops + 1` and
    /// written under the message's origin, and the message comes back with
    /// its hop count incremented, ready to relay.
    pub fn ingest(&self, mut msg: GossipMessage) -> Ingest {
        if msg.origin == self.config.node_id {
            trace!("Ignoring own gossip");
            return Ingest::Dropped(DropReason::OwnOrigin);
        }
        if msg.hops >= self.config.max_hops {
            trace!("Gossip from {} hit hop limit ({})", msg.origin, msg.hops);
            return Ingest::Dropped(DropReason::HopLimit);
        }

        let distance = msg.hops.saturating_add(1);
        let mut applied = 0;
        for (name, value) in &msg.fields {
            match name.parse::<FieldType>() {
                Ok(field_type) => {
                    let decayed =
                        decayed_intensity(value.intensity, distance, self.config.decay_rate);
                    self.store
                        .update_contribution(&msg.origin, field_type, decayed);
                    applied += 1;
                }
                Err(e) => debug!("Skipping field from {}: {}", msg.origin, e),
            }
        }

        msg.hops = distance;
        Ingest::Relay {
            applied,
            message: msg,
        }
    }

    async fn broadcast(&self, msg: &GossipMessage) -> usize {
        match msg.encode() {
            Ok(payload) => self.transport.broadcast(&self.config.peers, &payload).await,
            Err(e) => {
                debug!("Failed to encode gossip: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradient_fields::{EmitterConfig, FieldSet, FieldValue};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn protocol(node_id: &str, peers: Vec<String>, max_hops: u32) -> (Arc<GossipProtocol>, Arc<StateStore>) {
        let store = Arc::new(StateStore::new(node_id));
        let emitter = Emitter::new(node_id, None, EmitterConfig::default());
        let config = GossipConfig {
            max_hops,
            ..GossipConfig::new(node_id, loopback(), peers)
        };
        let protocol = GossipProtocol::bind(config, emitter, Arc::clone(&store)).unwrap();
        (protocol, store)
    }

    fn message(origin: &str, hops: u32, health: f64) -> GossipMessage {
        let mut fields = FieldSet::new();
        fields.insert(FieldType::Health, FieldValue::new(FieldType::Health, origin, health));
        fields.insert(FieldType::Load, FieldValue::new(FieldType::Load, origin, 0.5));
        GossipMessage {
            hops,
            ..GossipMessage::announce(origin, &fields)
        }
    }

    async fn recv_message(transport: &GossipTransport, wait: Duration) -> Option<GossipMessage> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        match transport.recv_timeout(&mut buf, wait).await.unwrap() {
            Recv::Datagram { len, .. } => Some(GossipMessage::decode(&buf[..len]).unwrap()),
            Recv::TimedOut => None,
        }
    }

    #[test]
    fn decay_one_hop_unit_rate() {
        let v = decayed_intensity(1.0, 1, 1.0);
        assert!((v - (-1.0f64).exp()).abs() < 1e-12);
        assert!(v > 0.36 && v < 0.38);
    }

    #[test]
    fn decay_zero_hops_is_identity() {
        for rate in [0.0, 0.5, 1.0, 3.0] {
            assert_eq!(decayed_intensity(0.73, 0, rate), 0.73);
        }
    }

    #[test]
    fn decay_strictly_decreasing_in_hops() {
        let mut last = decayed_intensity(0.9, 0, 0.4);
        for hops in 1..10 {
            let next = decayed_intensity(0.9, hops, 0.4);
            assert!(next < last);
            last = next;
        }
    }

    #[tokio::test]
    async fn starts_idle() {
        let (p, _) = protocol("node-a", vec![], 3);
        assert_eq!(p.state(), ProtocolState::Idle);
        assert!(p.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn own_origin_dropped_regardless_of_hops() {
        let (p, store) = protocol("node-a", vec![], 3);
        for hops in [0, 1, 5] {
            let outcome = p.ingest(message("node-a", hops, 0.9));
            assert_eq!(outcome, Ingest::Dropped(DropReason::OwnOrigin));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn hop_limit_dropped_without_mutation() {
        let (p, store) = protocol("node-a", vec![], 3);
        assert_eq!(p.ingest(message("node-b", 3, 0.9)), Ingest::Dropped(DropReason::HopLimit));
        assert_eq!(p.ingest(message("node-b", 7, 0.9)), Ingest::Dropped(DropReason::HopLimit));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn ingest_decays_and_attributes_to_origin() {
        let (p, store) = protocol("node-a", vec![], 3);

        let outcome = p.ingest(message("node-c", 1, 1.0));
        let Ingest::Relay { applied, message } = outcome else {
            panic!("expected relay");
        };
        assert_eq!(applied, 2);
        assert_eq!(message.hops, 2);
        assert_eq!(message.origin, "node-c");
        // Relayed intensities are the origin's, not the decayed copies
        assert_eq!(message.fields["health"].intensity, 1.0);

        let state = store.fields_for("node-c");
        assert!((state.health - (-2.0f64).exp()).abs() < 1e-12);
        assert!((state.load - 0.5 * (-2.0f64).exp()).abs() < 1e-12);
        assert_eq!(state.capacity, 0.0);
    }

    #[tokio::test]
    async fn unknown_field_names_are_skipped() {
        let (p, store) = protocol("node-a", vec![], 3);
        let mut msg = message("node-b", 0, 0.8);
        let stray = msg.fields["health"].clone();
        msg.fields.insert("latency".into(), stray);

        let Ingest::Relay { applied, .. } = p.ingest(msg) else {
            panic!("expected relay");
        };
        assert_eq!(applied, 2);
        assert!(store.contains("node-b"));
    }

    #[tokio::test]
    async fn relays_to_peers_with_incremented_hops() {
        let peer = GossipTransport::bind(loopback(), 64 * 1024, 64 * 1024).unwrap();
        let peer_addr = peer.local_addr().unwrap().to_string();
        let (p, _) = protocol("node-a", vec![peer_addr], 3);

        p.handle_incoming(message("node-b", 0, 0.9)).await;

        let relayed = recv_message(&peer, Duration::from_secs(2)).await.expect("relay");
        assert_eq!(relayed.origin, "node-b");
        assert_eq!(relayed.hops, 1);
    }

    #[tokio::test]
    async fn dropped_messages_are_not_relayed() {
        let peer = GossipTransport::bind(loopback(), 64 * 1024, 64 * 1024).unwrap();
        let peer_addr = peer.local_addr().unwrap().to_string();
        let (p, store) = protocol("node-a", vec![peer_addr], 2);

        p.handle_incoming(message("node-b", 2, 0.9)).await;
        p.handle_incoming(message("node-a", 0, 0.9)).await;

        assert!(recv_message(&peer, Duration::from_millis(200)).await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn propagate_once_stores_and_announces() {
        let peer = GossipTransport::bind(loopback(), 64 * 1024, 64 * 1024).unwrap();
        let peer_addr = peer.local_addr().unwrap().to_string();
        let (p, store) = protocol("node-a", vec![peer_addr], 3);

        assert_eq!(p.propagate_once().await, 1);
        assert!(store.contains("node-a"));

        let announced = recv_message(&peer, Duration::from_secs(2)).await.expect("announce");
        assert_eq!(announced.origin, "node-a");
        assert_eq!(announced.hops, 0);
        let names: Vec<_> = announced.fields.keys().cloned().collect();
        assert_eq!(names, vec!["capacity", "health", "load"]);
    }

    #[tokio::test]
    async fn listen_loop_ingests_and_ignores_garbage() {
        let (p, store) = protocol("node-a", vec![], 3);
        let addr = p.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = p.spawn(shutdown_rx);

        let sender = GossipTransport::bind(loopback(), 64 * 1024, 64 * 1024).unwrap();
        sender.send_raw(addr, b"{garbage").await.unwrap();
        let payload = message("node-z", 0, 1.0).encode().unwrap();
        sender.send_raw(addr, &payload).await.unwrap();

        let mut found = false;
        for _ in 0..100 {
            if store.contains("node-z") {
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(found, "gossip was not ingested");
        assert!((store.fields_for("node-z").health - (-1.0f64).exp()).abs() < 1e-12);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(p.state(), ProtocolState::Stopped);
    }

    #[tokio::test]
    async fn run_reaches_running_then_stops() {
        let (p, store) = protocol("node-a", vec![], 3);
        let mut states = p.subscribe_state();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = p.spawn(shutdown_rx);

        tokio::time::timeout(Duration::from_secs(2), states.wait_for(|s| *s == ProtocolState::Running))
            .await
            .unwrap()
            .unwrap();

        // The first tick fires immediately and records the local fields.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.contains("node-a"));

        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(p.state(), ProtocolState::Stopped);
    }

    #[test]
    fn ingest_ignores_empty_field_map() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        let (p, store) = protocol("node-a", vec![], 3);
        let msg = GossipMessage {
            origin: "node-b".into(),
            hops: 0,
            fields: BTreeMap::new(),
            timestamp: 0,
        };
        assert!(matches!(p.ingest(msg), Ingest::Relay { applied: 0, .. }));
        assert!(!store.contains("node-b"));
    }
}
