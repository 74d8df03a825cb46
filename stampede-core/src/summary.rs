use std::time::Duration;

use stampede_metrics::MetricsSnapshot;

use crate::iteration_metrics::{ITERATION_FAILED, ITERATIONS, VUS_MAX};
use crate::request_metrics::{FAILED_REQUESTS, HTTP_REQS, SUCCESSFUL_REQUESTS};
use crate::thresholds_eval::ThresholdReport;

/// Everything a finished (or cancelled) run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub elapsed: Duration,
    /// The run was stopped through [`crate::RunHandle::cancel`] before the schedule ended.
    pub cancelled: bool,
    pub metrics: MetricsSnapshot,
    pub thresholds: ThresholdReport,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.thresholds.overall_pass
    }

    pub fn requests_total(&self) -> u64 {
        self.metrics.counter(HTTP_REQS)
    }

    pub fn successful_requests(&self) -> u64 {
        self.metrics.counter(SUCCESSFUL_REQUESTS)
    }

    pub fn failed_requests(&self) -> u64 {
        self.metrics.counter(FAILED_REQUESTS)
    }

    pub fn iterations_total(&self) -> u64 {
        self.metrics.counter(ITERATIONS)
    }

    pub fn iterations_failed(&self) -> u64 {
        self.metrics.counter(ITERATION_FAILED)
    }

    pub fn checks_failed(&self) -> u64 {
        self.metrics.checks_failed()
    }

    pub fn peak_vus(&self) -> u64 {
        self.metrics
            .gauge(VUS_MAX)
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(0)
    }

    /// Completed requests per second over the whole run.
    pub fn requests_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.requests_total() as f64 / secs
        } else {
            0.0
        }
    }
}
