/// Percentile of an ascending-sorted sample set, interpolating linearly between the two
/// nearest ranks (`rank = p/100 * (n-1)`).
///
/// Returns `None` for an empty slice or a non-finite `p`; `p` is clamped to `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !p.is_finite() {
        return None;
    }

    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower_rank = rank.floor();

    let lower = *sorted.get(lower_rank as usize)?;
    let upper = *sorted.get(rank.ceil() as usize)?;

    Some(lower + (rank - lower_rank) * (upper - lower))
}

/// Point-in-time copy of a trend's samples, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendSnapshot {
    sorted: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendSummary {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

impl TrendSnapshot {
    pub fn from_samples(mut samples: Vec<f64>) -> Self {
        samples.sort_unstable_by(f64::total_cmp);
        Self { sorted: samples }
    }

    pub fn count(&self) -> u64 {
        self.sorted.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Samples in ascending order.
    pub fn values(&self) -> &[f64] {
        &self.sorted
    }

    pub fn min(&self) -> Option<f64> {
        self.sorted.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.sorted.last().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        Some(self.sorted.iter().sum::<f64>() / self.sorted.len() as f64)
    }

    /// Sample standard deviation (0 for a single sample).
    pub fn stdev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.sorted.len();
        if n < 2 {
            return Some(0.0);
        }
        let m2: f64 = self.sorted.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some((m2 / (n as f64 - 1.0)).sqrt())
    }

    pub fn percentile(&self, p: f64) -> Option<f64> {
        percentile(&self.sorted, p)
    }

    pub fn median(&self) -> Option<f64> {
        self.percentile(50.0)
    }

    pub fn summary(&self) -> TrendSummary {
        TrendSummary {
            count: self.count(),
            min: self.min(),
            max: self.max(),
            mean: self.mean(),
            stdev: self.stdev(),
            p50: self.percentile(50.0),
            p90: self.percentile(90.0),
            p95: self.percentile(95.0),
            p99: self.percentile(99.0),
        }
    }
}
