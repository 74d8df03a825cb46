use stampede_metrics::{MetricValue, MetricsSnapshot, TrendSnapshot};

use crate::thresholds::{Threshold, ThresholdAgg};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    /// `None` when the metric has no data for the aggregate.
    pub observed: Option<f64>,
    pub pass: bool,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ThresholdReport {
    pub overall_pass: bool,
    pub results: Vec<ThresholdResult>,
}

impl ThresholdReport {
    pub fn failures(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.results.iter().filter(|r| !r.pass)
    }
}

/// Evaluates every threshold against `snapshot`. No data never passes.
pub fn evaluate(snapshot: &MetricsSnapshot, thresholds: &[Threshold]) -> ThresholdReport {
    let results: Vec<ThresholdResult> = thresholds
        .iter()
        .map(|t| {
            let observed = snapshot
                .get(&t.metric)
                .and_then(|value| observed_value(value, t.expr.agg));
            let pass = observed.is_some_and(|v| t.expr.op.compare(v, t.expr.value));
            ThresholdResult {
                metric: t.metric.clone(),
                expression: t.expression.clone(),
                observed,
                pass,
            }
        })
        .collect();

    ThresholdReport {
        overall_pass: results.iter().all(|r| r.pass),
        results,
    }
}

fn observed_value(value: &MetricValue, agg: ThresholdAgg) -> Option<f64> {
    match (value, agg) {
        (MetricValue::Counter(c), ThresholdAgg::Count | ThresholdAgg::Value) => Some(*c as f64),
        (MetricValue::Gauge(g), ThresholdAgg::Value) => Some(*g as f64),

        (MetricValue::Rate(r), ThresholdAgg::Rate) => (r.total > 0).then(|| r.rate()),
        (MetricValue::Rate(r), ThresholdAgg::Count) => (r.total > 0).then_some(r.total as f64),

        (MetricValue::Trend(t), agg) => trend_value(t, agg),

        _ => None,
    }
}

fn trend_value(t: &TrendSnapshot, agg: ThresholdAgg) -> Option<f64> {
    match agg {
        ThresholdAgg::Avg => t.mean(),
        ThresholdAgg::Min => t.min(),
        ThresholdAgg::Max => t.max(),
        ThresholdAgg::Med => t.median(),
        ThresholdAgg::P(p) => t.percentile(p),
        ThresholdAgg::Count => (!t.is_empty()).then(|| t.count() as f64),
        ThresholdAgg::Rate | ThresholdAgg::Value => None,
    }
}
