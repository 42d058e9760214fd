//! Gradient Fields - Field Signals for Decentralized Load Balancing
//!
//! Every node continuously emits three scalar "field" signals derived from its
//! local metrics. Peers learn each other's fields through gossip and route
//! traffic by reading the aggregated view, with no central coordinator.
//!
//! # Architecture
//!
//! - **Types**: `FieldType`, `FieldValue`, `LocalFieldState`
//! - **Store**: `StateStore`, the per-source contribution table behind one
//!   reader/writer lock
//! - **Emitter**: turns a `MetricSource` into bounded health/load/capacity
//! - **Sampler**: read-only view over the store
//!
//! # Field Semantics
//!
//! ```text
//! FIELD      RANGE    MEANING
//! ─────────────────────────────────────────────
//! health     [0, 1]   1 = no errors, low latency
//! load       [0, 1]   weighted cpu/mem/connection pressure
//! capacity   [0, 1]   1 - load
//! ```
//!
//! All three are dimensionless, so nodes with different hardware are
//! comparable without a global normaliser.
//!
//! # Example
//!
//! ```
//! use gradient_fields::{FieldType, StateStore};
//!
//! let store = StateStore::new("node-a");
//! store.update_contribution("node-b", FieldType::Health, 1.7);
//!
//! let state = store.fields_for("node-b");
//! assert_eq!(state.health, 1.0);
//! assert_eq!(state.load, 0.0);
//! ```

pub mod emitter;
pub mod error;
pub mod sampler;
pub mod store;
pub mod types;

pub use emitter::{Emitter, EmitterConfig, MetricSource, DEFAULT_MAX_CONNECTIONS, METRICS_WINDOW};
pub use error::{Error, Result};
pub use sampler::Sampler;
pub use store::StateStore;
pub use types::{clamp01, now_millis, FieldSet, FieldType, FieldValue, LocalFieldState, NodeId};
