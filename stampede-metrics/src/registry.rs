use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::metrics::{MetricHandle, MetricKind, MetricStorage, Rate};
use crate::snapshot::{
    CheckSummary, MetricSeriesSummary, MetricValue, MetricsSnapshot, RateSnapshot, TrendSnapshot,
};

/// Name of the rate that aggregates every check outcome.
pub const CHECKS_METRIC: &str = "checks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(u32);

#[derive(Debug)]
struct MetricDef {
    name: Arc<str>,
    kind: MetricKind,
    storage: MetricStorage,
}

/// Named metrics for one run. Safe to share (`Arc<Registry>`) across any number of workers.
#[derive(Debug, Default)]
pub struct Registry {
    defs: RwLock<Vec<MetricDef>>,
    index: DashMap<Arc<str>, MetricId, ahash::RandomState>,
    checks: DashMap<Arc<str>, Arc<Rate>, ahash::RandomState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` as `kind`, or returns the existing id when it is already registered
    /// with the same kind.
    pub fn register(&self, name: &str, kind: MetricKind) -> Result<MetricId> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let existing = self.index.get(name).map(|e| *e.value());
        if let Some(id) = existing {
            return self.ensure_kind(id, name, kind);
        }

        let mut defs = self.defs.write();

        // Check again to avoid race
        let existing = self.index.get(name).map(|e| *e.value());
        if let Some(id) = existing {
            drop(defs);
            return self.ensure_kind(id, name, kind);
        }

        let id = MetricId(defs.len() as u32);
        let name: Arc<str> = Arc::from(name);
        defs.push(MetricDef {
            name: name.clone(),
            kind,
            storage: MetricStorage::new(kind),
        });
        self.index.insert(name, id);
        Ok(id)
    }

    fn ensure_kind(&self, id: MetricId, name: &str, requested: MetricKind) -> Result<MetricId> {
        let registered = self.defs.read().get(id.0 as usize).map(|d| d.kind);
        match registered {
            Some(registered) if registered != requested => Err(Error::KindMismatch {
                name: name.to_string(),
                registered,
                requested,
            }),
            _ => Ok(id),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<(MetricId, MetricKind)> {
        let id = self.index.get(name).map(|e| *e.value())?;
        let kind = self.defs.read().get(id.0 as usize)?.kind;
        Some((id, kind))
    }

    pub fn get_handle(&self, metric: MetricId) -> Option<MetricHandle> {
        self.defs
            .read()
            .get(metric.0 as usize)
            .map(|d| d.storage.handle())
    }

    /// Resolves (registering on first use) a write handle for `name`.
    pub fn handle(&self, name: &str, kind: MetricKind) -> Result<MetricHandle> {
        let id = self.register(name, kind)?;
        // Ids are never removed, so a registered id always resolves.
        self.get_handle(id).ok_or_else(|| Error::KindMismatch {
            name: name.to_string(),
            registered: kind,
            requested: kind,
        })
    }

    pub fn increment(&self, name: &str, n: u64) -> Result<()> {
        self.handle(name, MetricKind::Counter)?.increment(n);
        Ok(())
    }

    pub fn record_value(&self, name: &str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::NonFiniteValue {
                name: name.to_string(),
            });
        }
        self.handle(name, MetricKind::Trend)?.observe(value);
        Ok(())
    }

    /// Records `value` into a trend, in milliseconds.
    pub fn record_duration(&self, name: &str, value: Duration) -> Result<()> {
        self.record_value(name, value.as_secs_f64() * 1000.0)
    }

    pub fn record_bool(&self, name: &str, outcome: bool) -> Result<()> {
        self.handle(name, MetricKind::Rate)?.record_bool(outcome);
        Ok(())
    }

    pub fn set_gauge(&self, name: &str, value: i64) -> Result<()> {
        self.handle(name, MetricKind::Gauge)?.set_gauge(value);
        Ok(())
    }

    /// Adds `delta` to a gauge and returns the new value.
    pub fn add_gauge(&self, name: &str, delta: i64) -> Result<i64> {
        Ok(self.handle(name, MetricKind::Gauge)?.add_gauge(delta))
    }

    /// Records a named check outcome, both per check and into the aggregate `checks` rate.
    pub fn record_check(&self, name: &str, passed: bool) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let rate = match self.checks.get(name) {
            Some(r) => r.value().clone(),
            None => self
                .checks
                .entry(Arc::from(name))
                .or_insert_with(|| Arc::new(Rate::default()))
                .value()
                .clone(),
        };
        MetricHandle::Rate(rate).record_bool(passed);

        self.record_bool(CHECKS_METRIC, passed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        // Clone handles under the read lock, then copy values without holding it.
        let handles: Vec<(Arc<str>, MetricHandle)> = self
            .defs
            .read()
            .iter()
            .map(|d| (d.name.clone(), d.storage.handle()))
            .collect();

        let mut metrics: Vec<MetricSeriesSummary> = handles
            .into_iter()
            .map(|(name, handle)| {
                let value = match &handle {
                    MetricHandle::Counter(_) => MetricValue::Counter(handle.get_counter()),
                    MetricHandle::Gauge(_) => MetricValue::Gauge(handle.get_gauge()),
                    MetricHandle::Rate(_) => {
                        let (total, hits) = handle.get_rate();
                        MetricValue::Rate(RateSnapshot { hits, total })
                    }
                    MetricHandle::Trend(t) => {
                        let samples = t.lock().clone();
                        MetricValue::Trend(TrendSnapshot::from_samples(samples))
                    }
                };
                MetricSeriesSummary {
                    name: name.to_string(),
                    value,
                }
            })
            .collect();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));

        let mut checks: Vec<CheckSummary> = self
            .checks
            .iter()
            .map(|e| {
                let (total, hits) = e.value().load();
                CheckSummary {
                    name: e.key().to_string(),
                    passes: hits,
                    fails: total.saturating_sub(hits),
                }
            })
            .collect();
        checks.sort_by(|a, b| a.name.cmp(&b.name));

        MetricsSnapshot { metrics, checks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_per_name() {
        let metrics = Registry::new();
        let a = metrics
            .register("reqs", MetricKind::Counter)
            .unwrap_or_else(|e| panic!("{e}"));
        let b = metrics
            .register("reqs", MetricKind::Counter)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(a, b);
        assert_eq!(metrics.lookup("reqs"), Some((a, MetricKind::Counter)));
    }

    #[test]
    fn register_rejects_kind_mismatch_and_empty_names() {
        let metrics = Registry::new();
        if let Err(e) = metrics.increment("reqs", 1) {
            panic!("{e}");
        }

        match metrics.record_value("reqs", 1.0) {
            Err(Error::KindMismatch {
                registered,
                requested,
                ..
            }) => {
                assert_eq!(registered, MetricKind::Counter);
                assert_eq!(requested, MetricKind::Trend);
            }
            other => panic!("expected kind mismatch, got {other:?}"),
        }

        assert!(matches!(metrics.increment("", 1), Err(Error::EmptyName)));
    }

    #[test]
    fn record_value_rejects_non_finite_samples() {
        let metrics = Registry::new();
        assert!(matches!(
            metrics.record_value("t", f64::NAN),
            Err(Error::NonFiniteValue { .. })
        ));
        assert!(metrics.snapshot().trend("t").is_none());
    }

    #[test]
    fn snapshot_reports_every_kind_sorted_by_name() {
        let metrics = Registry::new();
        let results = [
            metrics.record_duration("z_latency", Duration::from_millis(50)),
            metrics.increment("a_count", 3),
            metrics.record_bool("m_rate", true),
            metrics.record_bool("m_rate", false),
            metrics.set_gauge("g", -2),
        ];
        for r in results {
            if let Err(e) = r {
                panic!("{e}");
            }
        }

        let snapshot = metrics.snapshot();
        let names: Vec<&str> = snapshot.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a_count", "g", "m_rate", "z_latency"]);

        assert_eq!(snapshot.counter("a_count"), 3);
        assert_eq!(snapshot.gauge("g"), Some(-2));
        assert_eq!(snapshot.rate("m_rate"), Some(RateSnapshot { hits: 1, total: 2 }));
        let trend = snapshot
            .trend("z_latency")
            .unwrap_or_else(|| panic!("missing trend"));
        assert_eq!(trend.values(), &[50.0]);
    }

    #[test]
    fn checks_are_tracked_per_name_and_in_aggregate() {
        let metrics = Registry::new();
        for (name, ok) in [("status is 200", true), ("status is 200", false), ("body ok", true)] {
            if let Err(e) = metrics.record_check(name, ok) {
                panic!("{e}");
            }
        }

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot.checks,
            vec![
                CheckSummary {
                    name: "body ok".to_string(),
                    passes: 1,
                    fails: 0,
                },
                CheckSummary {
                    name: "status is 200".to_string(),
                    passes: 1,
                    fails: 1,
                },
            ]
        );
        assert_eq!(snapshot.checks_failed(), 1);
        assert_eq!(
            snapshot.rate(CHECKS_METRIC),
            Some(RateSnapshot { hits: 2, total: 3 })
        );
    }

    #[test]
    fn concurrent_recording_loses_no_updates() {
        const WORKERS: usize = 8;
        const SAMPLES: usize = 2_500;

        let metrics = Arc::new(Registry::new());
        std::thread::scope(|scope| {
            for w in 0..WORKERS {
                let metrics = metrics.clone();
                scope.spawn(move || {
                    for i in 0..SAMPLES {
                        let results = [
                            metrics.record_value("latency", (w * SAMPLES + i) as f64),
                            metrics.increment("requests", 1),
                            metrics.record_bool("failed", i % 4 == 0),
                        ];
                        for r in results {
                            if let Err(e) = r {
                                panic!("{e}");
                            }
                        }
                    }
                });
            }
        });

        let snapshot = metrics.snapshot();
        let expected = (WORKERS * SAMPLES) as u64;
        assert_eq!(
            snapshot.trend("latency").map(TrendSnapshot::count),
            Some(expected)
        );
        assert_eq!(snapshot.counter("requests"), expected);
        assert_eq!(
            snapshot.rate("failed"),
            Some(RateSnapshot {
                hits: expected / 4,
                total: expected,
            })
        );
    }

    #[test]
    fn snapshot_while_recording_never_sees_partial_state() {
        let metrics = Arc::new(Registry::new());
        std::thread::scope(|scope| {
            let writer = metrics.clone();
            scope.spawn(move || {
                for i in 0..10_000u32 {
                    if let Err(e) = writer.record_value("t", f64::from(i)) {
                        panic!("{e}");
                    }
                    if let Err(e) = writer.record_bool("r", i % 2 == 0) {
                        panic!("{e}");
                    }
                }
            });

            for _ in 0..50 {
                let snapshot = metrics.snapshot();
                if let Some(t) = snapshot.trend("t") {
                    assert!(t.values().iter().all(|v| v.is_finite()));
                    assert!(t.values().windows(2).all(|w| w[0] <= w[1]));
                }
                if let Some(r) = snapshot.rate("r") {
                    assert!(r.hits <= r.total);
                }
            }
        });
    }
}
