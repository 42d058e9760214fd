//! Synthetic metrics source.

use gradient_fields::MetricSource;
use rand::Rng;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// How often the running loop perturbs the readings.
pub const JITTER_PERIOD: Duration = Duration::from_secs(1);

/// One reading of every metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSample {
    pub error_rate: f64,
    pub latency_p99_ms: f64,
    pub cpu: f64,
    pub memory: f64,
    pub connections: u32,
}

impl Default for MetricsSample {
    fn default() -> Self {
        Self {
            error_rate: 0.01,
            latency_p99_ms: 20.0,
            cpu: 0.3,
            memory: 0.35,
            connections: 20,
        }
    }
}

impl MetricsSample {
    /// Bounded random walk: each reading moves by at most its step and is
    /// clamped to its range.
    fn jittered<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let connections = walk(rng, self.connections as f64, 5.0, 1.0, 200.0);
        Self {
            error_rate: walk(rng, self.error_rate, 0.005, 0.0, 0.3),
            latency_p99_ms: walk(rng, self.latency_p99_ms, 10.0, 10.0, 1200.0),
            cpu: walk(rng, self.cpu, 0.05, 0.1, 0.99),
            memory: walk(rng, self.memory, 0.04, 0.1, 0.99),
            connections: connections as u32,
        }
    }
}

fn walk<R: Rng + ?Sized>(rng: &mut R, value: f64, step: f64, lo: f64, hi: f64) -> f64 {
    let delta = rng.gen::<f64>() * 2.0 * step - step;
    (value + delta).clamp(lo, hi)
}

/// Metric source whose readings drift randomly while [`run`](Self::run) is active.
#[derive(Debug, Default)]
pub struct JitterMetrics {
    sample: RwLock<MetricsSample>,
}

impl JitterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample(sample: MetricsSample) -> Self {
        Self {
            sample: RwLock::new(sample),
        }
    }

    pub fn sample(&self) -> MetricsSample {
        *self.sample.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one perturbation step.
    pub fn jitter_step<R: Rng + ?Sized>(&self, rng: &mut R) {
        let mut sample = self.sample.write().unwrap_or_else(PoisonError::into_inner);
        *sample = sample.jittered(rng);
    }

    /// Perturb once per [`JITTER_PERIOD`] until `shutdown` flips to true or
    /// its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(JITTER_PERIOD);
        // First tick fires immediately; keep the initial sample for one period.
        ticker.tick().await;
        info!("Synthetic metrics jitter started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut rng = rand::thread_rng();
                    self.jitter_step(&mut rng);
                    debug!(sample = ?self.sample(), "Metrics jittered");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Synthetic metrics jitter stopped");
    }
}

impl MetricSource for JitterMetrics {
    fn error_rate(&self, _window: Duration) -> f64 {
        self.sample().error_rate
    }

    fn latency_p99(&self, _window: Duration) -> f64 {
        self.sample().latency_p99_ms
    }

    fn cpu_utilization(&self) -> f64 {
        self.sample().cpu
    }

    fn memory_utilization(&self) -> f64 {
        self.sample().memory
    }

    fn active_connections(&self) -> u32 {
        self.sample().connections
    }
}
