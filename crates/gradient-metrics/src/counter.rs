//! Routing decision counter.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

/// Counts routing decisions by `"<selected>:<reason>"` label.
#[derive(Debug, Default)]
pub struct DecisionCounter {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl DecisionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, selected: &str, reason: &str) {
        let label = format!("{selected}:{reason}");
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts.entry(label).or_insert(0) += 1;
    }

    /// Count for one label, 0 if never seen.
    pub fn get(&self, selected: &str, reason: &str) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts
            .get(&format!("{selected}:{reason}"))
            .copied()
            .unwrap_or(0)
    }

    /// Prometheus text exposition, one line per label in label order.
    pub fn render(&self) -> String {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();
        for (label, count) in counts.iter() {
            // Writing into a String cannot fail.
            let _ = writeln!(
                out,
                "gradient_routing_decisions_total{{label=\"{label}\"}} {count}"
            );
        }
        out
    }
}
