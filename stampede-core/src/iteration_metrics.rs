use std::time::Duration;

use stampede_metrics::{MetricHandle, MetricKind, Registry};

pub const ITERATIONS: &str = "iterations";
/// Wall time per iteration, in milliseconds.
pub const ITERATION_DURATION: &str = "iteration_duration";
pub const ITERATION_FAILED: &str = "iteration_failed";
pub const VUS: &str = "vus";
pub const VUS_MAX: &str = "vus_max";

#[derive(Debug, Clone)]
pub struct IterationMetrics {
    iterations: MetricHandle,
    duration_ms: MetricHandle,
    failed: MetricHandle,
    vus: MetricHandle,
    vus_max: MetricHandle,
}

impl IterationMetrics {
    pub fn register(metrics: &Registry) -> stampede_metrics::Result<Self> {
        Ok(Self {
            iterations: metrics.handle(ITERATIONS, MetricKind::Counter)?,
            duration_ms: metrics.handle(ITERATION_DURATION, MetricKind::Trend)?,
            failed: metrics.handle(ITERATION_FAILED, MetricKind::Counter)?,
            vus: metrics.handle(VUS, MetricKind::Gauge)?,
            vus_max: metrics.handle(VUS_MAX, MetricKind::Gauge)?,
        })
    }

    pub fn record_iteration(&self, success: bool, duration: Duration) {
        self.iterations.increment(1);
        self.duration_ms.observe(duration.as_secs_f64() * 1000.0);
        if !success {
            self.failed.increment(1);
        }
    }

    /// Marks one more live worker and bumps the peak.
    pub fn vu_started(&self) {
        let now = self.vus.add_gauge(1);
        self.vus_max.max_gauge(now);
    }

    pub fn vu_stopped(&self) {
        self.vus.add_gauge(-1);
    }

    pub fn live_vus(&self) -> i64 {
        self.vus.get_gauge()
    }

    pub fn iterations_total(&self) -> u64 {
        self.iterations.get_counter()
    }
}
