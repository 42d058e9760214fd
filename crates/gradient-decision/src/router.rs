//! Field-weighted router.

use crate::config::RouterConfig;
use gradient_fields::{NodeId, StateStore};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Scores candidates from the shared state store and picks one.
#[derive(Debug)]
pub struct Router {
    store: Arc<StateStore>,
    // Swapped wholesale; readers copy it out and never hold the lock while scoring.
    config: RwLock<RouterConfig>,
}

impl Router {
    /// Router with the default weights.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self::with_config(store, RouterConfig::default())
    }

    pub fn with_config(store: Arc<StateStore>, config: RouterConfig) -> Self {
        Self {
            store,
            config: RwLock::new(config),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> RouterConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the configuration. In-flight selections may still use the old one.
    pub fn update_config(&self, config: RouterConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Score each distinct candidate, in lexical node-id order.
    ///
    /// Unknown candidates score as all-zero fields.
    pub fn scores<S: AsRef<str>>(&self, candidates: &[S]) -> Vec<(NodeId, f64)> {
        let config = self.config();
        let mut scores = BTreeMap::new();
        for id in candidates {
            let id = id.as_ref();
            if scores.contains_key(id) {
                continue;
            }
            let fields = self.store.fields_for(id);
            scores.insert(id.to_string(), config.score(&fields));
        }
        scores.into_iter().collect()
    }

    /// Select a node using the thread-local random source.
    pub fn select_node<S: AsRef<str>>(&self, candidates: &[S]) -> Option<NodeId> {
        self.select_node_with(candidates, &mut rand::thread_rng())
    }

    /// Select a node drawing from `rng`. `None` for an empty candidate list.
    pub fn select_node_with<S, R>(&self, candidates: &[S], rng: &mut R) -> Option<NodeId>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let temperature = self.config().temperature;
        let scores = self.scores(candidates);
        let selected = softmax_select(&scores, temperature, rng).cloned();
        trace!(?selected, temperature, "Routing decision over {} candidates", scores.len());
        selected
    }
}

/// Pick from `(node, score)` pairs, scanning in the given order.
///
/// `temperature <= 0` is a deterministic arg-max (first best wins ties).
/// Otherwise each node is weighted `e^(score / temperature)`, a value is drawn
/// uniformly from `[0, Σweight)`, and the first node whose running total
/// reaches the draw is returned.
pub fn softmax_select<'a, R: Rng + ?Sized>(
    scores: &'a [(NodeId, f64)],
    temperature: f64,
    rng: &mut R,
) -> Option<&'a NodeId> {
    if scores.is_empty() {
        return None;
    }
    if temperature <= 0.0 {
        return arg_max(scores);
    }

    // Shifting by the best score leaves the distribution unchanged and keeps
    // every weight in (0, 1], so small temperatures cannot overflow.
    let best = scores
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = scores
        .iter()
        .map(|(_, s)| ((s - best) / temperature).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return arg_max(scores);
    }

    let draw = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for ((node, _), weight) in scores.iter().zip(&weights) {
        cumulative += weight;
        if cumulative >= draw {
            return Some(node);
        }
    }
    arg_max(scores)
}

fn arg_max(scores: &[(NodeId, f64)]) -> Option<&NodeId> {
    let mut best: Option<(&NodeId, f64)> = None;
    for (node, score) in scores {
        match best {
            Some((_, best_score)) if *score <= best_score => {}
            _ => best = Some((node, *score)),
        }
    }
    best.map(|(node, _)| node)
}
