//! Concurrent field state store.
//!
//! The contribution table maps each source node to its latest field
//! intensities. It is the single source of truth for the emitter, the gossip
//! protocol and the router.
//!
//! # Locking
//!
//! One reader/writer lock guards the whole table. Every public call takes the
//! lock exactly once and performs no I/O while holding it, so:
//!
//! - a single call is never observed half-applied
//! - two separate calls have no atomicity between them (a reader between two
//!   `update_contribution` calls can see a partially updated node)
//!
//! # Conflict Resolution
//!
//! Last write wins per `(node, field)`. Timestamps are not compared, so a
//! delayed, more decayed relay can overwrite a fresher value that arrived
//! earlier. Entries are never pruned.

use crate::types::{clamp01, now_millis, FieldSet, FieldType, LocalFieldState, NodeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

/// Latest contributions of a single source.
#[derive(Debug, Default, Clone)]
struct NodeEntry {
    fields: HashMap<FieldType, f64>,
    updated_at: u64,
}

impl NodeEntry {
    fn to_state(&self, node_id: &str) -> LocalFieldState {
        let get = |ft| self.fields.get(&ft).copied().unwrap_or(0.0);
        LocalFieldState {
            node_id: node_id.to_string(),
            health: get(FieldType::Health),
            load: get(FieldType::Load),
            capacity: get(FieldType::Capacity),
            last_updated: self.updated_at,
        }
    }
}

/// Per-source field contribution table.
#[derive(Debug)]
pub struct StateStore {
    local_node_id: NodeId,
    contributions: RwLock<HashMap<NodeId, NodeEntry>>,
}

impl StateStore {
    /// Create an empty store owned by `local_node_id`.
    pub fn new(local_node_id: impl Into<NodeId>) -> Self {
        Self {
            local_node_id: local_node_id.into(),
            contributions: RwLock::new(HashMap::new()),
        }
    }

    /// The node id local writes are recorded under.
    pub fn local_node_id(&self) -> &str {
        &self.local_node_id
    }

    // Every critical section leaves the table consistent, so a poisoned lock
    // is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<NodeId, NodeEntry>> {
        self.contributions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<NodeId, NodeEntry>> {
        self.contributions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `value` (clamped to [0, 1]) as `source`'s contribution for
    /// `field_type`, creating the source's entry if needed.
    pub fn update_contribution(&self, source: &str, field_type: FieldType, value: f64) {
        let now = now_millis();
        let stored = clamp01(value);
        {
            let mut table = self.write();
            let entry = table.entry(source.to_string()).or_default();
            entry.fields.insert(field_type, stored);
            entry.updated_at = now;
        }
        trace!(source, field = %field_type, value = stored, "Contribution updated");
    }

    /// Upsert every field of the local node under a single lock acquisition.
    pub fn set_local(&self, fields: &FieldSet) {
        let now = now_millis();
        {
            let mut table = self.write();
            let entry = table.entry(self.local_node_id.clone()).or_default();
            for value in fields.values() {
                entry.fields.insert(value.field_type, clamp01(value.intensity));
            }
            entry.updated_at = now;
        }
        trace!(node = %self.local_node_id, fields = fields.len(), "Local fields set");
    }

    /// Point-in-time copy of every known node's state, ordered by node id.
    pub fn snapshot(&self) -> BTreeMap<NodeId, LocalFieldState> {
        let table = self.read();
        table
            .iter()
            .map(|(node, entry)| (node.clone(), entry.to_state(node)))
            .collect()
    }

    /// State of a single node; all zeros if the node is unknown.
    pub fn fields_for(&self, node: &str) -> LocalFieldState {
        let table = self.read();
        match table.get(node) {
            Some(entry) => entry.to_state(node),
            None => LocalFieldState::neutral(node),
        }
    }

    /// Whether any contribution has been recorded for `node`.
    pub fn contains(&self, node: &str) -> bool {
        self.read().contains_key(node)
    }

    /// Number of known nodes.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if no node has been recorded.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn update_creates_source_entry() {
        let store = StateStore::new("local");
        assert!(!store.contains("node-b"));

        store.update_contribution("node-b", FieldType::Health, 0.7);

        let state = store.fields_for("node-b");
        assert_eq!(state.health, 0.7);
        assert_eq!(state.load, 0.0);
        assert_eq!(state.capacity, 0.0);
        assert!(state.last_updated > 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_node_reads_neutral() {
        let store = StateStore::new("local");
        let state = store.fields_for("nobody");
        assert_eq!(state, LocalFieldState::neutral("nobody"));
        assert!(store.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let store = StateStore::new("local");
        store.update_contribution("n", FieldType::Load, 0.9);
        store.update_contribution("n", FieldType::Load, 0.1);
        assert_eq!(store.fields_for("n").load, 0.1);
    }

    #[test]
    fn set_local_writes_under_local_id() {
        let store = StateStore::new("me");
        let mut fields = FieldSet::new();
        fields.insert(FieldType::Health, FieldValue::new(FieldType::Health, "me", 0.8));
        fields.insert(FieldType::Load, FieldValue::new(FieldType::Load, "me", 1.5));
        fields.insert(FieldType::Capacity, FieldValue::new(FieldType::Capacity, "me", 0.3));

        store.set_local(&fields);

        let state = store.fields_for("me");
        assert_eq!(state.health, 0.8);
        assert_eq!(state.load, 1.0);
        assert_eq!(state.capacity, 0.3);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let store = StateStore::new("local");
        store.update_contribution("b", FieldType::Health, 0.5);
        store.update_contribution("a", FieldType::Health, 0.4);

        let snap = store.snapshot();
        store.update_contribution("a", FieldType::Health, 0.9);

        let ids: Vec<_> = snap.keys().cloned().collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(snap["a"].health, 0.4);
        assert_eq!(store.fields_for("a").health, 0.9);
    }

    #[test]
    fn concurrent_writers_and_snapshots_stay_in_range() {
        let store = Arc::new(StateStore::new("local"));
        let mut handles = Vec::new();

        for w in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    let value = (i as f64 / 100.0) - 2.0 + w as f64;
                    let ft = FieldType::ALL[i % 3];
                    store.update_contribution(&format!("node-{}", i % 7), ft, value);
                }
            }));
        }

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    for state in store.snapshot().values() {
                        for ft in FieldType::ALL {
                            let v = state.get(ft);
                            assert!((0.0..=1.0).contains(&v), "{} out of range: {}", ft, v);
                        }
                    }
                }
            })
        };

        for h in handles {
            h.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(store.len(), 7);
    }

    proptest! {
        #[test]
        fn stored_value_is_clamped(value in proptest::num::f64::ANY) {
            let store = StateStore::new("local");
            store.update_contribution("n", FieldType::Capacity, value);
            let stored = store.fields_for("n").capacity;
            prop_assert!((0.0..=1.0).contains(&stored));
            if !value.is_nan() {
                prop_assert_eq!(stored, value.max(0.0).min(1.0));
            }
        }
    }
}
