use rand::Rng;

use crate::error::{Error, Result};

/// Picks one of several weighted entries per draw.
///
/// Weights are relative; they don't need to sum to 1.
#[derive(Debug, Clone)]
pub struct WeightedDispatcher<T> {
    entries: Vec<T>,
    cumulative: Vec<f64>,
    total: f64,
}

impl<T> WeightedDispatcher<T> {
    /// `weight` names and weighs every entry; it is called once per entry.
    pub fn new(entries: Vec<T>, weight: impl Fn(&T) -> (&str, f64)) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::NoScenarios);
        }

        let mut cumulative = Vec::with_capacity(entries.len());
        let mut total = 0.0;
        for e in &entries {
            let (name, w) = weight(e);
            if !w.is_finite() || w <= 0.0 {
                return Err(Error::InvalidWeight {
                    name: name.to_string(),
                    weight: w,
                });
            }
            total += w;
            if !total.is_finite() {
                return Err(Error::InvalidWeight {
                    name: name.to_string(),
                    weight: w,
                });
            }
            cumulative.push(total);
        }

        Ok(Self {
            entries,
            cumulative,
            total,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Probability that a draw picks entry `idx`.
    pub fn probability(&self, idx: usize) -> Option<f64> {
        let end = *self.cumulative.get(idx)?;
        let start = if idx == 0 { 0.0 } else { self.cumulative[idx - 1] };
        Some((end - start) / self.total)
    }

    pub fn select_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let draw = rng.gen_range(0.0..self.total);
        let idx = self.cumulative.partition_point(|end| *end <= draw);
        // Float accumulation can leave `draw` at or past the last boundary.
        idx.min(self.entries.len() - 1)
    }

    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.entries[self.select_index(rng)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn dispatcher(weights: &[(&'static str, f64)]) -> Result<WeightedDispatcher<(&'static str, f64)>> {
        WeightedDispatcher::new(weights.to_vec(), |(name, w)| (*name, *w))
    }

    #[test]
    fn rejects_empty_and_invalid_weights() {
        assert!(matches!(dispatcher(&[]), Err(Error::NoScenarios)));

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            match dispatcher(&[("a", 1.0), ("b", bad)]) {
                Err(Error::InvalidWeight { name, .. }) => assert_eq!(name, "b"),
                other => panic!("expected InvalidWeight for {bad}, got {other:?}"),
            }
        }

        // Each weight is finite but their sum is not.
        match dispatcher(&[("a", 1e308), ("b", 1e308)]) {
            Err(Error::InvalidWeight { name, .. }) => assert_eq!(name, "b"),
            other => panic!("expected InvalidWeight for an overflowing total, got {other:?}"),
        }
    }

    #[test]
    fn single_entry_always_wins() {
        let d = dispatcher(&[("only", 0.25)]).unwrap_or_else(|e| panic!("{e}"));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            assert_eq!(d.select(&mut rng).0, "only");
        }
        assert_eq!(d.probability(0), Some(1.0));
    }

    #[test]
    fn frequencies_converge_to_weight_ratios() {
        const DRAWS: usize = 100_000;

        // Weights need not sum to 1.
        let d = dispatcher(&[("browse", 4.0), ("cart", 4.0), ("frontend", 2.0)])
            .unwrap_or_else(|e| panic!("{e}"));
        let mut rng = StdRng::seed_from_u64(0x5eed);

        let mut counts = [0usize; 3];
        for _ in 0..DRAWS {
            counts[d.select_index(&mut rng)] += 1;
        }

        let chi_squared: f64 = counts
            .iter()
            .enumerate()
            .map(|(i, observed)| {
                let expected = d.probability(i).unwrap_or(0.0) * DRAWS as f64;
                (*observed as f64 - expected).powi(2) / expected
            })
            .sum();

        // Critical value for 2 degrees of freedom at p = 0.001.
        assert!(chi_squared < 13.816, "chi^2 = {chi_squared}, counts = {counts:?}");
    }

    #[test]
    fn draws_are_reproducible_for_a_seed() {
        let d = dispatcher(&[("a", 1.0), ("b", 3.0)]).unwrap_or_else(|e| panic!("{e}"));
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64).map(|_| d.select_index(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }
}
