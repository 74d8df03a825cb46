use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};

/// Pause between two iterations of a virtual user, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThinkTime {
    min: Duration,
    max: Duration,
}

impl ThinkTime {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidThinkTime { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn fixed(d: Duration) -> Self {
        Self { min: d, max: d }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let nanos = rng.gen_range(self.min.as_nanos()..=self.max.as_nanos());
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
