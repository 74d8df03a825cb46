pub mod error;
pub mod metrics;
pub mod registry;
pub mod snapshot;
pub mod trend;

pub use error::{Error, Result};
pub use metrics::{MetricHandle, MetricKind, Rate};
pub use registry::{CHECKS_METRIC, MetricId, Registry};
pub use snapshot::{
    CheckSummary, MetricSeriesSummary, MetricValue, MetricsSnapshot, RateSnapshot, TrendSnapshot,
    TrendSummary,
};
pub use trend::percentile;
