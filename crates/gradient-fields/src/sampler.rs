//! Read-only view over the state store.

use crate::store::StateStore;
use crate::types::{LocalFieldState, NodeId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Hands out copies of the store contents to consumers that must not write.
#[derive(Debug, Clone)]
pub struct Sampler {
    store: Arc<StateStore>,
}

impl Sampler {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Every known node's state.
    pub fn current_state(&self) -> BTreeMap<NodeId, LocalFieldState> {
        self.store.snapshot()
    }

    /// A single node's state, zeros if unknown.
    pub fn node_state(&self, id: &str) -> LocalFieldState {
        self.store.fields_for(id)
    }
}
