//! Gradient Decision - Field-Weighted Routing
//!
//! Turns the aggregated field view into a routing choice without a central
//! coordinator.
//!
//! # Scoring
//!
//! ```text
//! score = health_weight * health + capacity_weight * capacity - load_penalty * load
//! ```
//!
//! # Selection
//!
//! ```text
//! TEMPERATURE   POLICY
//! ───────────────────────────────────────────────────────────
//!   0           arg-max (pure exploitation)
//!   > 0         softmax: P(node) ∝ e^(score / temperature)
//!   large       approaches uniform (exploration)
//! ```
//!
//! Candidates are scanned in lexical node-id order, which fixes both the
//! arg-max tie-break and the softmax accumulation order.
//!
//! The random source is a parameter, so tests can pin it.

mod config;
mod error;
mod round_robin;
mod router;

pub use config::RouterConfig;
pub use error::{Error, Result};
pub use round_robin::RoundRobin;
pub use router::{softmax_select, Router};
