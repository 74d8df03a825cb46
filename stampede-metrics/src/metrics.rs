use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Rate,
    Trend,
}

/// Boolean outcomes: `hits` counts `true` samples out of `total`.
#[derive(Debug, Default)]
pub struct Rate {
    pub total: AtomicU64,
    pub hits: AtomicU64,
}

impl Rate {
    pub(crate) fn load(&self) -> (u64, u64) {
        // Read `total` last so a racing `add` never shows more hits than trials.
        let hits = self.hits.load(Ordering::Acquire);
        let total = self.total.load(Ordering::Acquire);
        (total.max(hits), hits)
    }
}

#[derive(Debug)]
pub(crate) enum MetricStorage {
    Counter(Arc<AtomicU64>),
    Gauge(Arc<AtomicI64>), // Supports negative values
    Rate(Arc<Rate>),
    Trend(Arc<Mutex<Vec<f64>>>),
}

impl MetricStorage {
    pub(crate) fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => MetricStorage::Counter(Arc::new(AtomicU64::new(0))),
            MetricKind::Gauge => MetricStorage::Gauge(Arc::new(AtomicI64::new(0))),
            MetricKind::Rate => MetricStorage::Rate(Arc::new(Rate::default())),
            MetricKind::Trend => MetricStorage::Trend(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    pub(crate) fn handle(&self) -> MetricHandle {
        match self {
            MetricStorage::Counter(a) => MetricHandle::Counter(a.clone()),
            MetricStorage::Gauge(a) => MetricHandle::Gauge(a.clone()),
            MetricStorage::Rate(a) => MetricHandle::Rate(a.clone()),
            MetricStorage::Trend(a) => MetricHandle::Trend(a.clone()),
        }
    }
}

// Public handle for writing metrics
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Arc<AtomicU64>),
    Gauge(Arc<AtomicI64>),
    Rate(Arc<Rate>),
    Trend(Arc<Mutex<Vec<f64>>>),
}

impl MetricHandle {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricHandle::Counter(_) => MetricKind::Counter,
            MetricHandle::Gauge(_) => MetricKind::Gauge,
            MetricHandle::Rate(_) => MetricKind::Rate,
            MetricHandle::Trend(_) => MetricKind::Trend,
        }
    }

    #[inline]
    pub fn increment(&self, value: u64) {
        if let MetricHandle::Counter(c) = self {
            c.fetch_add(value, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn set_gauge(&self, value: i64) {
        if let MetricHandle::Gauge(g) = self {
            g.store(value, Ordering::Relaxed);
        }
    }

    /// Adds `delta` and returns the new value (0 for non-gauge handles).
    #[inline]
    pub fn add_gauge(&self, delta: i64) -> i64 {
        if let MetricHandle::Gauge(g) = self {
            g.fetch_add(delta, Ordering::AcqRel).saturating_add(delta)
        } else {
            0
        }
    }

    /// Raises the gauge to `value` if it is currently lower.
    #[inline]
    pub fn max_gauge(&self, value: i64) {
        if let MetricHandle::Gauge(g) = self {
            g.fetch_max(value, Ordering::AcqRel);
        }
    }

    #[inline]
    pub fn add_rate(&self, hits: u64, total: u64) {
        if let MetricHandle::Rate(r) = self {
            // Bump `total` first; `Rate::load` reads in the opposite order.
            r.total.fetch_add(total, Ordering::AcqRel);
            r.hits.fetch_add(hits, Ordering::AcqRel);
        }
    }

    #[inline]
    pub fn record_bool(&self, outcome: bool) {
        self.add_rate(u64::from(outcome), 1);
    }

    #[inline]
    pub fn observe(&self, value: f64) {
        if let MetricHandle::Trend(t) = self {
            t.lock().push(value);
        }
    }
}

impl MetricHandle {
    pub fn get_counter(&self) -> u64 {
        if let MetricHandle::Counter(c) = self {
            c.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    pub fn get_gauge(&self) -> i64 {
        if let MetricHandle::Gauge(g) = self {
            g.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    pub fn get_rate(&self) -> (u64, u64) {
        if let MetricHandle::Rate(r) = self {
            r.load()
        } else {
            (0, 0)
        }
    }

    pub fn trend_len(&self) -> usize {
        if let MetricHandle::Trend(t) = self {
            t.lock().len()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_storage_new_initializes_defaults() {
        match MetricStorage::new(MetricKind::Counter) {
            MetricStorage::Counter(c) => assert_eq!(c.load(Ordering::Relaxed), 0),
            _ => panic!("expected counter"),
        }

        match MetricStorage::new(MetricKind::Gauge) {
            MetricStorage::Gauge(g) => assert_eq!(g.load(Ordering::Relaxed), 0),
            _ => panic!("expected gauge"),
        }

        match MetricStorage::new(MetricKind::Rate) {
            MetricStorage::Rate(r) => {
                assert_eq!(r.total.load(Ordering::Relaxed), 0);
                assert_eq!(r.hits.load(Ordering::Relaxed), 0);
            }
            _ => panic!("expected rate"),
        }

        match MetricStorage::new(MetricKind::Trend) {
            MetricStorage::Trend(t) => assert!(t.lock().is_empty()),
            _ => panic!("expected trend"),
        }
    }

    #[test]
    fn metric_handle_counter_gauge_and_rate_update() {
        let c = MetricHandle::Counter(Arc::new(AtomicU64::new(0)));
        c.increment(2);
        c.increment(3);
        assert_eq!(c.get_counter(), 5);

        let g = MetricHandle::Gauge(Arc::new(AtomicI64::new(0)));
        g.set_gauge(10);
        assert_eq!(g.add_gauge(5), 15);
        assert_eq!(g.add_gauge(-3), 12);
        g.max_gauge(7);
        assert_eq!(g.get_gauge(), 12);
        g.max_gauge(20);
        assert_eq!(g.get_gauge(), 20);

        let r = MetricHandle::Rate(Arc::new(Rate::default()));
        r.add_rate(2, 10);
        r.record_bool(true);
        r.record_bool(false);
        assert_eq!(r.get_rate(), (12, 3));
    }

    #[test]
    fn mismatched_handle_operations_are_ignored() {
        let c = MetricHandle::Counter(Arc::new(AtomicU64::new(0)));
        c.observe(1.0);
        c.record_bool(true);
        assert_eq!(c.get_counter(), 0);
        assert_eq!(c.trend_len(), 0);
        assert_eq!(c.kind(), MetricKind::Counter);
    }

    #[test]
    fn metric_handle_trend_observes_values() {
        let t = MetricHandle::Trend(Arc::new(Mutex::new(Vec::new())));
        t.observe(10.0);
        t.observe(20.0);
        assert_eq!(t.trend_len(), 2);
    }
}
