mod dispatch;
mod error;
pub mod http;
mod iteration_metrics;
mod plan;
mod request_metrics;
pub mod runner;
mod scenario;
mod summary;
mod think_time;
mod thresholds;
mod thresholds_eval;

pub use async_trait::async_trait;
pub use dispatch::WeightedDispatcher;
pub use error::{Error, Result};
pub use crate::http::{HttpClient, HttpRequest, HttpResponse};
pub use iteration_metrics::{
    ITERATION_DURATION, ITERATION_FAILED, ITERATIONS, IterationMetrics, VUS, VUS_MAX,
};
pub use plan::{DEFAULT_BASE_URL, DEFAULT_TICK, RunPlan, RunPlanBuilder};
pub use request_metrics::{
    ERRORS, FAILED_REQUESTS, HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS, RequestMetrics,
    RequestSample, SUCCESSFUL_REQUESTS,
};
pub use runner::{
    LiveMetrics, ProgressFn, ProgressUpdate, RampingSchedule, RunHandle, Stage, StageRamp,
    StageSnapshot, run, start, start_with_progress,
};
pub use scenario::{Scenario, ScenarioContext, ScenarioError, WeightedScenario};
pub use summary::RunReport;
pub use think_time::ThinkTime;
pub use thresholds::{Threshold, ThresholdAgg, ThresholdExpr, ThresholdOp, parse_threshold_expr};
pub use thresholds_eval::{ThresholdReport, ThresholdResult, evaluate};

pub use stampede_metrics::{
    CHECKS_METRIC, CheckSummary, MetricKind, MetricSeriesSummary, MetricValue, MetricsSnapshot,
    RateSnapshot, Registry, TrendSnapshot, TrendSummary,
};
