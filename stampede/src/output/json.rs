use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

use stampede_core::{MetricValue, ProgressFn, RunPlan, RunReport, ThresholdReport};

use super::OutputFormatter;

/// Prints nothing until the run ends, then one JSON document on stdout.
pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _plan_path: &Path, _plan: &RunPlan) {}

    fn progress(&self) -> Option<ProgressFn> {
        None
    }

    fn print_summary(&self, report: &RunReport) -> anyhow::Result<()> {
        let doc = build_report(report);
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &doc)?;
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonReport<'a> {
    pub kind: &'static str,
    pub elapsed_secs: f64,
    pub cancelled: bool,
    pub passed: bool,
    pub totals: JsonTotals,
    pub metrics: BTreeMap<&'a str, JsonMetric>,
    pub checks: Vec<JsonCheck<'a>>,
    pub thresholds: &'a ThresholdReport,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonTotals {
    pub requests_total: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub iterations_total: u64,
    pub iterations_failed: u64,
    pub checks_failed_total: u64,
    pub peak_vus: u64,
    pub requests_per_sec: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum JsonMetric {
    Counter {
        value: u64,
    },
    Gauge {
        value: i64,
    },
    Rate {
        rate: f64,
        hits: u64,
        total: u64,
    },
    /// Milliseconds.
    Trend {
        count: u64,
        avg: Option<f64>,
        min: Option<f64>,
        med: Option<f64>,
        p90: Option<f64>,
        p95: Option<f64>,
        p99: Option<f64>,
        max: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonCheck<'a> {
    pub name: &'a str,
    pub passes: u64,
    pub fails: u64,
}

fn build_report(report: &RunReport) -> JsonReport<'_> {
    let metrics = report
        .metrics
        .metrics
        .iter()
        .map(|s| {
            let metric = match &s.value {
                MetricValue::Counter(v) => JsonMetric::Counter { value: *v },
                MetricValue::Gauge(v) => JsonMetric::Gauge { value: *v },
                MetricValue::Rate(r) => JsonMetric::Rate {
                    rate: r.rate(),
                    hits: r.hits,
                    total: r.total,
                },
                MetricValue::Trend(t) => {
                    let h = t.summary();
                    JsonMetric::Trend {
                        count: h.count,
                        avg: h.mean,
                        min: h.min,
                        med: h.p50,
                        p90: h.p90,
                        p95: h.p95,
                        p99: h.p99,
                        max: h.max,
                    }
                }
            };
            (s.name.as_str(), metric)
        })
        .collect();

    let checks = report
        .metrics
        .checks
        .iter()
        .map(|c| JsonCheck {
            name: &c.name,
            passes: c.passes,
            fails: c.fails,
        })
        .collect();

    JsonReport {
        kind: "summary",
        elapsed_secs: report.elapsed.as_secs_f64(),
        cancelled: report.cancelled,
        passed: report.passed(),
        totals: JsonTotals {
            requests_total: report.requests_total(),
            successful_requests: report.successful_requests(),
            failed_requests: report.failed_requests(),
            iterations_total: report.iterations_total(),
            iterations_failed: report.iterations_failed(),
            checks_failed_total: report.checks_failed(),
            peak_vus: report.peak_vus(),
            requests_per_sec: report.requests_per_sec(),
        },
        metrics,
        checks,
        thresholds: &report.thresholds,
    }
}
