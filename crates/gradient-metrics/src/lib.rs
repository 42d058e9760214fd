//! Gradient Metrics
//!
//! - [`DecisionCounter`]: labelled routing-decision counts, dumped as
//!   Prometheus text.
//! - [`JitterMetrics`]: a synthetic [`MetricSource`](gradient_fields::MetricSource)
//!   that random-walks its readings once per second, for demos and local runs.

mod counter;
mod jitter;

pub use counter::DecisionCounter;
pub use jitter::{JitterMetrics, MetricsSample, JITTER_PERIOD};
