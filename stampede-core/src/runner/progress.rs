use std::time::Duration;

use super::schedule::StageSnapshot;

#[derive(Debug, Clone)]
pub struct LiveMetrics {
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    /// Requests/sec observed during the last tick.
    pub rps_now: f64,
    /// Failed requests / total requests during the last tick (0..=1).
    pub error_rate_now: f64,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based).
    pub tick: u64,
    pub elapsed: Duration,
    pub total_duration: Duration,
    pub stage: Option<StageSnapshot>,
    pub target_vus: u64,
    pub live_vus: u64,
    pub max_vus: u64,
    pub metrics: LiveMetrics,
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

/// Turns running totals into per-tick rates.
#[derive(Debug, Default)]
pub(crate) struct RateTracker {
    prev_requests: u64,
    prev_failed: u64,
    prev_elapsed: Duration,
}

impl RateTracker {
    pub(crate) fn update(
        &mut self,
        elapsed: Duration,
        requests_total: u64,
        failed_requests_total: u64,
        iterations_total: u64,
    ) -> LiveMetrics {
        let dt = elapsed.saturating_sub(self.prev_elapsed).as_secs_f64();
        let d_req = requests_total.saturating_sub(self.prev_requests);
        let d_failed = failed_requests_total.saturating_sub(self.prev_failed);

        self.prev_requests = requests_total;
        self.prev_failed = failed_requests_total;
        self.prev_elapsed = elapsed;

        LiveMetrics {
            requests_total,
            failed_requests_total,
            iterations_total,
            rps_now: if dt > 0.0 { d_req as f64 / dt } else { 0.0 },
            error_rate_now: if d_req > 0 {
                (d_failed as f64 / d_req as f64).min(1.0)
            } else {
                0.0
            },
        }
    }
}
