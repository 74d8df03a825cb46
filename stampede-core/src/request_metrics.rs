use std::time::Duration;

use stampede_metrics::{MetricHandle, MetricKind, Registry};

pub const HTTP_REQS: &str = "http_reqs";
/// Response time of completed requests, in milliseconds.
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const SUCCESSFUL_REQUESTS: &str = "successful_requests";
pub const FAILED_REQUESTS: &str = "failed_requests";
pub const ERRORS: &str = "errors";

/// Built-in request series, resolved once per run.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    reqs: MetricHandle,
    duration_ms: MetricHandle,
    failed_rate: MetricHandle,
    successful: MetricHandle,
    failed: MetricHandle,
    errors: MetricHandle,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestSample {
    /// 2xx response received in time.
    pub ok: bool,
    /// `None` when no response arrived (transport error or timeout).
    pub latency: Option<Duration>,
}

impl RequestMetrics {
    pub fn register(metrics: &Registry) -> stampede_metrics::Result<Self> {
        Ok(Self {
            reqs: metrics.handle(HTTP_REQS, MetricKind::Counter)?,
            duration_ms: metrics.handle(HTTP_REQ_DURATION, MetricKind::Trend)?,
            failed_rate: metrics.handle(HTTP_REQ_FAILED, MetricKind::Rate)?,
            successful: metrics.handle(SUCCESSFUL_REQUESTS, MetricKind::Counter)?,
            failed: metrics.handle(FAILED_REQUESTS, MetricKind::Counter)?,
            errors: metrics.handle(ERRORS, MetricKind::Rate)?,
        })
    }

    pub fn record_request(&self, sample: RequestSample) {
        self.reqs.increment(1);
        if let Some(latency) = sample.latency {
            self.duration_ms.observe(latency.as_secs_f64() * 1000.0);
        }

        self.failed_rate.record_bool(!sample.ok);
        self.errors.record_bool(!sample.ok);
        if sample.ok {
            self.successful.increment(1);
        } else {
            self.failed.increment(1);
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.reqs.get_counter()
    }

    pub fn failed_total(&self) -> u64 {
        self.failed.get_counter()
    }

    /// A failed iteration counts as one more failed outcome, even if it never reached the network.
    pub fn record_failed_iteration(&self) {
        self.failed.increment(1);
        self.errors.record_bool(true);
    }
}
