//! Field emitter.
//!
//! Pure function of a metrics capability producing the local node's three
//! field intensities:
//!
//! ```text
//! health   = 0.6 * (1 - min(errorRate / 0.1, 1)) + 0.4 * (1 - min(p99 / 1000ms, 1))
//! load     = 0.4 * cpu + 0.3 * mem + 0.3 * (activeConns / maxConnections)
//! capacity = 1 - load
//! ```
//!
//! Each result is clamped to [0, 1]. Without a metrics capability every field
//! is zero: unknown is treated as unhealthy.

use crate::types::{clamp01, FieldSet, FieldType, FieldValue, NodeId};
use std::sync::Arc;
use std::time::Duration;

/// Default connection count that maps to full connection pressure.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 100;

/// Window over which error rate and latency are sampled.
pub const METRICS_WINDOW: Duration = Duration::from_secs(60);

/// Error rate at which the error component of health bottoms out.
const ERROR_RATE_CEILING: f64 = 0.1;

/// p99 latency (ms) at which the latency component of health bottoms out.
const LATENCY_CEILING_MS: f64 = 1000.0;

/// Read-only source of local node metrics.
pub trait MetricSource: Send + Sync {
    /// Fraction of failed requests over `window`.
    fn error_rate(&self, window: Duration) -> f64;
    /// 99th percentile latency in milliseconds over `window`.
    fn latency_p99(&self, window: Duration) -> f64;
    /// CPU utilisation in [0, 1].
    fn cpu_utilization(&self) -> f64;
    /// Memory utilisation in [0, 1].
    fn memory_utilization(&self) -> f64;
    /// Number of connections currently open.
    fn active_connections(&self) -> u32;
}

/// Emitter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Connection count treated as saturation. Zero means the default.
    pub max_connections: u32,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Produces the local node's field intensities.
#[derive(Clone)]
pub struct Emitter {
    node_id: NodeId,
    metrics: Option<Arc<dyn MetricSource>>,
    config: EmitterConfig,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("node_id", &self.node_id)
            .field("has_metrics", &self.metrics.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Emitter {
    /// Create an emitter. `metrics` may be absent.
    pub fn new(
        node_id: impl Into<NodeId>,
        metrics: Option<Arc<dyn MetricSource>>,
        mut config: EmitterConfig,
    ) -> Self {
        if config.max_connections == 0 {
            config.max_connections = DEFAULT_MAX_CONNECTIONS;
        }
        Self {
            node_id: node_id.into(),
            metrics,
            config,
        }
    }

    /// Node the emitted fields are attributed to.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn config(&self) -> EmitterConfig {
        self.config
    }

    /// Health from error rate and p99 latency.
    pub fn health(&self) -> f64 {
        let Some(metrics) = &self.metrics else {
            return 0.0;
        };
        let error_rate = metrics.error_rate(METRICS_WINDOW);
        let latency_p99 = metrics.latency_p99(METRICS_WINDOW);

        let error_component = 1.0 - (error_rate / ERROR_RATE_CEILING).min(1.0);
        let latency_component = 1.0 - (latency_p99 / LATENCY_CEILING_MS).min(1.0);
        clamp01(0.6 * error_component + 0.4 * latency_component)
    }

    /// Load from cpu, memory and connection pressure.
    pub fn load(&self) -> f64 {
        let Some(metrics) = &self.metrics else {
            return 0.0;
        };
        let cpu = metrics.cpu_utilization();
        let mem = metrics.memory_utilization();
        let conn_pressure =
            f64::from(metrics.active_connections()) / f64::from(self.config.max_connections);
        clamp01(0.4 * cpu + 0.3 * mem + 0.3 * conn_pressure)
    }

    /// Remaining headroom.
    pub fn capacity(&self) -> f64 {
        if self.metrics.is_none() {
            return 0.0;
        }
        clamp01(1.0 - self.load())
    }

    /// Emit all three fields stamped with this node's id and the current time.
    pub fn emit_all(&self) -> FieldSet {
        // Capacity is derived from the same load sample so the pair stays consistent.
        let load = self.load();
        let capacity = if self.metrics.is_some() { clamp01(1.0 - load) } else { 0.0 };
        let values = [
            (FieldType::Health, self.health()),
            (FieldType::Load, load),
            (FieldType::Capacity, capacity),
        ];
        values
            .into_iter()
            .map(|(ft, intensity)| (ft, FieldValue::new(ft, self.node_id.clone(), intensity)))
            .collect()
    }
}
