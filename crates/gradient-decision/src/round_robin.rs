//! Round-robin baseline selector.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Cycles through candidates, ignoring fields entirely.
///
/// The cursor advances before indexing, so the first pick over
/// `[a, b, c]` is `b`.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<'a, S: AsRef<str>>(&self, candidates: &'a [S]) -> Option<&'a str> {
        if candidates.is_empty() {
            return None;
        }
        let len = candidates.len();
        let prev = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        Some(candidates[(prev + 1) % len].as_ref())
    }
}
