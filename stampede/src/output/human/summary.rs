use std::fmt::Write as _;

use stampede_core::{MetricValue, MetricsSnapshot, RunReport, ThresholdReport, VUS, VUS_MAX};

use super::format::{format_duration, format_ms_opt, format_percent, format_rate};

pub(crate) fn render(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(
        out,
        "  elapsed: {}{}",
        format_duration(report.elapsed),
        if report.cancelled { " (cancelled)" } else { "" }
    )
    .ok();
    writeln!(
        out,
        "  requests: {} (successful {}, failed {}) rps={}",
        report.requests_total(),
        report.successful_requests(),
        report.failed_requests(),
        format_rate(report.requests_per_sec())
    )
    .ok();
    writeln!(
        out,
        "  iterations: {} (failed {})",
        report.iterations_total(),
        report.iterations_failed()
    )
    .ok();
    writeln!(out, "  peak_vus: {}", report.peak_vus()).ok();
    writeln!(out, "  checks_failed_total: {}", report.checks_failed()).ok();

    render_checks(&report.metrics, &mut out);
    render_metrics(&report.metrics, &mut out);
    render_thresholds(&report.thresholds, &mut out);

    writeln!(
        out,
        "\nresult: {}",
        if report.passed() { "PASS" } else { "FAIL" }
    )
    .ok();
    out
}

fn render_checks(snapshot: &MetricsSnapshot, out: &mut String) {
    if snapshot.checks.is_empty() {
        return;
    }

    out.push_str("\nchecks\n");
    for c in &snapshot.checks {
        let status = if c.fails > 0 { "FAIL" } else { "OK" };
        writeln!(
            out,
            "  {}: pass={} fail={} [{status}]",
            c.name, c.passes, c.fails
        )
        .ok();
    }
}

fn render_metrics(snapshot: &MetricsSnapshot, out: &mut String) {
    if snapshot.metrics.is_empty() {
        return;
    }

    out.push_str("\nmetrics\n");
    for s in &snapshot.metrics {
        // `vus` ends at 0; show it next to its peak instead of alone.
        if s.name == VUS_MAX {
            continue;
        }
        if s.name == VUS
            && let MetricValue::Gauge(end) = &s.value
        {
            let peak = snapshot.gauge(VUS_MAX).unwrap_or(*end);
            writeln!(out, "  {VUS} = end={end} peak={peak}").ok();
            continue;
        }

        match &s.value {
            MetricValue::Counter(v) => {
                writeln!(out, "  {} = {v}", s.name).ok();
            }
            MetricValue::Gauge(v) => {
                writeln!(out, "  {} = {v}", s.name).ok();
            }
            MetricValue::Rate(r) => {
                writeln!(
                    out,
                    "  {} = {} ({}/{})",
                    s.name,
                    format_percent(r.rate()),
                    r.hits,
                    r.total
                )
                .ok();
            }
            MetricValue::Trend(t) => {
                let h = t.summary();
                writeln!(
                    out,
                    "  {} = avg={} min={} med={} p90={} p95={} p99={} max={} (n={})",
                    s.name,
                    format_ms_opt(h.mean),
                    format_ms_opt(h.min),
                    format_ms_opt(h.p50),
                    format_ms_opt(h.p90),
                    format_ms_opt(h.p95),
                    format_ms_opt(h.p99),
                    format_ms_opt(h.max),
                    h.count
                )
                .ok();
            }
        }
    }
}

fn render_thresholds(report: &ThresholdReport, out: &mut String) {
    if report.results.is_empty() {
        return;
    }

    out.push_str("\nthresholds\n");
    for r in &report.results {
        let observed = match r.observed {
            Some(v) => format!("observed={v:.3}"),
            None => "no data".to_string(),
        };
        let status = if r.pass { "PASS" } else { "FAIL" };
        writeln!(out, "  {}: {} {observed} [{status}]", r.metric, r.expression).ok();
    }
}
