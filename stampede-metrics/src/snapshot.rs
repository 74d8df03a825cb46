use crate::metrics::MetricKind;
pub use crate::trend::{TrendSnapshot, TrendSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateSnapshot {
    pub hits: u64,
    pub total: u64,
}

impl RateSnapshot {
    /// `hits / total`, or 0 when nothing was recorded.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }

    pub fn misses(&self) -> u64 {
        self.total.saturating_sub(self.hits)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(i64),
    Rate(RateSnapshot),
    Trend(TrendSnapshot),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Rate(_) => MetricKind::Rate,
            MetricValue::Trend(_) => MetricKind::Trend,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeriesSummary {
    pub name: String,
    pub value: MetricValue,
}

impl MetricSeriesSummary {
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Point-in-time copy of every metric in a registry, sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub metrics: Vec<MetricSeriesSummary>,
    pub checks: Vec<CheckSummary>,
}

impl MetricsSnapshot {
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.metrics
            .binary_search_by(|m| m.name.as_str().cmp(name))
            .ok()
            .and_then(|idx| self.metrics.get(idx))
            .map(|m| &m.value)
    }

    pub fn counter(&self, name: &str) -> u64 {
        match self.get(name) {
            Some(MetricValue::Counter(v)) => *v,
            _ => 0,
        }
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(MetricValue::Gauge(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn rate(&self, name: &str) -> Option<RateSnapshot> {
        match self.get(name) {
            Some(MetricValue::Rate(r)) => Some(*r),
            _ => None,
        }
    }

    pub fn trend(&self, name: &str) -> Option<&TrendSnapshot> {
        match self.get(name) {
            Some(MetricValue::Trend(t)) => Some(t),
            _ => None,
        }
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_with_zero_trials_reports_zero() {
        let r = RateSnapshot::default();
        assert_eq!(r.rate(), 0.0);
        assert_eq!(r.misses(), 0);
    }

    #[test]
    fn rate_divides_hits_by_total() {
        let r = RateSnapshot { hits: 3, total: 40 };
        assert!((r.rate() - 0.075).abs() < 1e-12);
        assert_eq!(r.misses(), 37);
    }

    #[test]
    fn typed_lookups_ignore_other_kinds() {
        let snapshot = MetricsSnapshot {
            metrics: vec![
                MetricSeriesSummary {
                    name: "a".to_string(),
                    value: MetricValue::Counter(4),
                },
                MetricSeriesSummary {
                    name: "b".to_string(),
                    value: MetricValue::Rate(RateSnapshot { hits: 1, total: 2 }),
                },
            ],
            checks: Vec::new(),
        };

        assert_eq!(snapshot.counter("a"), 4);
        assert_eq!(snapshot.counter("b"), 0);
        assert!(snapshot.rate("a").is_none());
        assert_eq!(snapshot.rate("b"), Some(RateSnapshot { hits: 1, total: 2 }));
        assert!(snapshot.trend("missing").is_none());
    }
}
