use std::time::{Duration, Instant};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    pub fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

/// How the target moves inside a stage window.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum StageRamp {
    /// Interpolate from the previous stage's target to this stage's target.
    #[default]
    Linear,
    /// Jump to this stage's target when the stage starts and hold it.
    Step,
}

#[derive(Debug, Clone)]
pub struct StageSnapshot {
    pub index: usize,
    pub count: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
    pub current_target: u64,
}

/// Desired VU concurrency over time, from an ordered list of stages.
#[derive(Debug, Clone)]
pub struct RampingSchedule {
    ramp: StageRamp,
    stages: Vec<Stage>,
    cumulative_ends: Vec<Duration>,
}

impl RampingSchedule {
    pub fn new(stages: Vec<Stage>, ramp: StageRamp) -> Result<Self> {
        if stages.is_empty() {
            return Err(Error::InvalidStages);
        }
        if let Some(index) = stages.iter().position(|s| s.duration.is_zero()) {
            return Err(Error::ZeroDurationStage { index });
        }

        let now = Instant::now();
        let mut cumulative_ends = Vec::with_capacity(stages.len());
        let mut acc = Duration::ZERO;
        for (index, s) in stages.iter().enumerate() {
            // The run deadline is `start + total`, so the total must fit on the clock.
            acc = acc
                .checked_add(s.duration)
                .filter(|total| now.checked_add(*total).is_some())
                .ok_or(Error::StagesTooLong { index })?;
            cumulative_ends.push(acc);
        }

        Ok(Self {
            ramp,
            stages,
            cumulative_ends,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn ramp(&self) -> StageRamp {
        self.ramp
    }

    pub fn total_duration(&self) -> Duration {
        self.cumulative_ends
            .last()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Largest concurrency any stage asks for.
    pub fn max_target(&self) -> u64 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    pub fn is_done(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Index of the stage whose `[start, end)` window contains `elapsed`.
    fn stage_index(&self, elapsed: Duration) -> Option<usize> {
        let idx = self.cumulative_ends.partition_point(|end| *end <= elapsed);
        (idx < self.stages.len()).then_some(idx)
    }

    fn stage_bounds(&self, idx: usize) -> (Duration, Duration) {
        let start = if idx == 0 {
            Duration::ZERO
        } else {
            self.cumulative_ends[idx - 1]
        };
        (start, self.cumulative_ends[idx])
    }

    fn start_target(&self, idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            self.stages[idx - 1].target
        }
    }

    /// Target concurrency at `elapsed` since run start; 0 once every stage has elapsed.
    pub fn target_at(&self, elapsed: Duration) -> u64 {
        let Some(idx) = self.stage_index(elapsed) else {
            return 0;
        };

        let end_target = self.stages[idx].target;
        if self.ramp == StageRamp::Step {
            return end_target;
        }

        let (stage_start, stage_end) = self.stage_bounds(idx);
        let stage_duration = stage_end.saturating_sub(stage_start);
        let stage_elapsed = elapsed.saturating_sub(stage_start);
        let start_target = self.start_target(idx);

        // Linear interpolation across the stage, rounded half away from zero.
        let start_f = start_target as f64;
        let delta = end_target as f64 - start_f;
        let frac = stage_elapsed.as_secs_f64() / stage_duration.as_secs_f64().max(f64::MIN_POSITIVE);

        let cur = (start_f + delta * frac.clamp(0.0, 1.0)).round();
        let (lo, hi) = if start_target <= end_target {
            (start_target, end_target)
        } else {
            (end_target, start_target)
        };
        (cur.max(0.0) as u64).clamp(lo, hi)
    }

    pub fn stage_snapshot_at(&self, elapsed: Duration) -> Option<StageSnapshot> {
        let total = self.total_duration();
        let idx = self
            .stage_index(elapsed)
            .unwrap_or_else(|| self.stages.len().saturating_sub(1));

        let (stage_start, stage_end) = self.stage_bounds(idx);
        let clamped = elapsed.min(total);
        let stage_duration = stage_end.saturating_sub(stage_start);
        let stage_elapsed = clamped.saturating_sub(stage_start).min(stage_duration);

        Some(StageSnapshot {
            index: idx,
            count: self.stages.len(),
            stage_elapsed,
            stage_remaining: stage_duration.saturating_sub(stage_elapsed),
            start_target: self.start_target(idx),
            end_target: self.stages.get(idx)?.target,
            current_target: self.target_at(elapsed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn schedule(stages: &[(f64, u64)], ramp: StageRamp) -> RampingSchedule {
        let stages = stages
            .iter()
            .map(|(d, t)| Stage::new(secs(*d), *t))
            .collect();
        RampingSchedule::new(stages, ramp).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn rejects_empty_and_zero_duration_stages() {
        assert!(matches!(
            RampingSchedule::new(Vec::new(), StageRamp::Linear),
            Err(Error::InvalidStages)
        ));

        let stages = vec![
            Stage::new(secs(1.0), 5),
            Stage::new(Duration::ZERO, 5),
        ];
        assert!(matches!(
            RampingSchedule::new(stages, StageRamp::Linear),
            Err(Error::ZeroDurationStage { index: 1 })
        ));
    }

    #[test]
    fn rejects_a_total_the_clock_cannot_reach() {
        let stages = vec![
            Stage::new(secs(60.0), 5),
            Stage::new(Duration::from_secs(u64::MAX), 5),
        ];
        assert!(matches!(
            RampingSchedule::new(stages, StageRamp::Linear),
            Err(Error::StagesTooLong { index: 1 })
        ));

        let stages = vec![Stage::new(Duration::MAX, 1), Stage::new(secs(1.0), 0)];
        assert!(matches!(
            RampingSchedule::new(stages, StageRamp::Step),
            Err(Error::StagesTooLong { index: 0 })
        ));
    }

    #[test]
    fn linear_ramp_interpolates_and_rounds() {
        let s = schedule(&[(10.0, 10), (10.0, 10), (10.0, 0)], StageRamp::Linear);

        assert_eq!(s.target_at(Duration::ZERO), 0);
        assert_eq!(s.target_at(secs(2.5)), 3); // 2.5 rounds away from zero
        assert_eq!(s.target_at(secs(5.0)), 5);
        assert_eq!(s.target_at(secs(10.0)), 10);
        assert_eq!(s.target_at(secs(15.0)), 10);
        assert_eq!(s.target_at(secs(25.0)), 5);
        assert_eq!(s.target_at(secs(29.99)), 0);
        assert_eq!(s.target_at(secs(30.0)), 0);
        assert!(s.is_done(secs(30.0)));
        assert!(!s.is_done(secs(29.99)));
    }

    #[test]
    fn three_stage_plan_under_each_ramp_convention() {
        let stages = [(1.0, 5), (2.0, 5), (1.0, 0)];

        let linear = schedule(&stages, StageRamp::Linear);
        assert_eq!(linear.target_at(Duration::ZERO), 0);
        assert_eq!(linear.target_at(secs(1.5)), 5);
        assert_eq!(linear.target_at(secs(3.5)), 3);
        assert_eq!(linear.target_at(secs(4.0)), 0);

        let step = schedule(&stages, StageRamp::Step);
        assert_eq!(step.target_at(Duration::ZERO), 5);
        assert_eq!(step.target_at(secs(1.5)), 5);
        assert_eq!(step.target_at(secs(3.5)), 0);
        assert_eq!(step.target_at(secs(4.0)), 0);
    }

    #[test]
    fn stage_snapshot_reports_current_window() {
        let s = schedule(&[(2.0, 4), (2.0, 8)], StageRamp::Linear);

        let snap = s
            .stage_snapshot_at(secs(3.0))
            .unwrap_or_else(|| panic!("expected snapshot"));
        assert_eq!(snap.index, 1);
        assert_eq!(snap.count, 2);
        assert_eq!(snap.start_target, 4);
        assert_eq!(snap.end_target, 8);
        assert_eq!(snap.current_target, 6);
        assert_eq!(snap.stage_elapsed, secs(1.0));
        assert_eq!(snap.stage_remaining, secs(1.0));

        let done = s
            .stage_snapshot_at(secs(10.0))
            .unwrap_or_else(|| panic!("expected snapshot"));
        assert_eq!(done.index, 1);
        assert_eq!(done.stage_remaining, Duration::ZERO);
        assert_eq!(done.current_target, 0);
        assert_eq!(s.max_target(), 8);
    }

    fn stages_strategy() -> impl Strategy<Value = Vec<(u64, u64)>> {
        prop::collection::vec((1u64..5_000, 0u64..200), 1..8)
    }

    proptest! {
        #[test]
        fn starts_at_zero_and_ends_at_zero(raw in stages_strategy()) {
            let stages: Vec<Stage> = raw
                .iter()
                .map(|(ms, t)| Stage::new(Duration::from_millis(*ms), *t))
                .collect();
            let s = RampingSchedule::new(stages, StageRamp::Linear)
                .unwrap_or_else(|e| panic!("{e}"));

            prop_assert_eq!(s.target_at(Duration::ZERO), 0);
            prop_assert_eq!(s.target_at(s.total_duration()), 0);
        }

        #[test]
        fn monotonic_within_each_stage(raw in stages_strategy(), steps in 2usize..40) {
            let stages: Vec<Stage> = raw
                .iter()
                .map(|(ms, t)| Stage::new(Duration::from_millis(*ms), *t))
                .collect();
            let s = RampingSchedule::new(stages.clone(), StageRamp::Linear)
                .unwrap_or_else(|e| panic!("{e}"));

            let mut stage_start = Duration::ZERO;
            let mut prev_target = 0u64;
            for stage in &stages {
                let mut last: Option<u64> = None;
                for i in 1..steps {
                    let offset = stage.duration.mul_f64(i as f64 / steps as f64);
                    let cur = s.target_at(stage_start + offset);

                    let (lo, hi) = (prev_target.min(stage.target), prev_target.max(stage.target));
                    prop_assert!(cur >= lo && cur <= hi);

                    if let Some(last) = last {
                        if stage.target >= prev_target {
                            prop_assert!(cur >= last);
                        } else {
                            prop_assert!(cur <= last);
                        }
                    }
                    last = Some(cur);
                }
                stage_start += stage.duration;
                prev_target = stage.target;
            }
        }
    }
}
