use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::WeightedDispatcher;
use crate::error::{Error, Result};
use crate::http::DEFAULT_REQUEST_TIMEOUT;
use crate::runner::schedule::{RampingSchedule, Stage, StageRamp};
use crate::scenario::WeightedScenario;
use crate::think_time::ThinkTime;
use crate::thresholds::Threshold;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// A validated run: nothing here can fail once a run has started.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub(crate) schedule: Arc<RampingSchedule>,
    pub(crate) dispatcher: Arc<WeightedDispatcher<WeightedScenario>>,
    pub(crate) thresholds: Vec<Threshold>,
    pub(crate) base_url: Arc<str>,
    pub(crate) think_time: ThinkTime,
    pub(crate) tick: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) seed: Option<u64>,
}

impl RunPlan {
    pub fn builder() -> RunPlanBuilder {
        RunPlanBuilder::default()
    }

    pub fn schedule(&self) -> &RampingSchedule {
        &self.schedule
    }

    pub fn scenarios(&self) -> &[WeightedScenario] {
        self.dispatcher.entries()
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn think_time(&self) -> ThinkTime {
        self.think_time
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[derive(Debug, Default)]
pub struct RunPlanBuilder {
    stages: Vec<Stage>,
    ramp: StageRamp,
    scenarios: Vec<WeightedScenario>,
    thresholds: Vec<(String, String)>,
    base_url: Option<String>,
    think_time: Option<(Duration, Duration)>,
    tick: Option<Duration>,
    request_timeout: Option<Duration>,
    seed: Option<u64>,
}

impl RunPlanBuilder {
    pub fn stage(mut self, duration: Duration, target: u64) -> Self {
        self.stages.push(Stage::new(duration, target));
        self
    }

    pub fn stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages.extend(stages);
        self
    }

    pub fn ramp(mut self, ramp: StageRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn scenario(mut self, scenario: WeightedScenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Adds a threshold expression (`p(95)<500`) on `metric`; parsed in [`Self::build`].
    pub fn threshold(mut self, metric: impl Into<String>, expression: impl Into<String>) -> Self {
        self.thresholds.push((metric.into(), expression.into()));
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Default think time for scenarios that don't set their own.
    pub fn think_time(mut self, min: Duration, max: Duration) -> Self {
        self.think_time = Some((min, max));
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = Some(tick);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<RunPlan> {
        let schedule = RampingSchedule::new(self.stages, self.ramp)?;

        let mut seen = HashSet::new();
        for s in &self.scenarios {
            if s.name.is_empty() {
                return Err(Error::EmptyScenarioName);
            }
            if !seen.insert(s.name.clone()) {
                return Err(Error::DuplicateScenario(s.name.to_string()));
            }
        }
        let dispatcher = WeightedDispatcher::new(self.scenarios, |s| (&*s.name, s.weight))?;

        let thresholds = self
            .thresholds
            .into_iter()
            .map(|(metric, expr)| Threshold::parse(metric, expr))
            .collect::<Result<Vec<_>>>()?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        validate_base_url(&base_url)?;

        let think_time = match self.think_time {
            Some((min, max)) => ThinkTime::new(min, max)?,
            None => ThinkTime::none(),
        };

        let tick = self.tick.unwrap_or(DEFAULT_TICK);
        if tick.is_zero() {
            return Err(Error::InvalidTick);
        }

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(Error::InvalidRequestTimeout);
        }

        Ok(RunPlan {
            schedule: Arc::new(schedule),
            dispatcher: Arc::new(dispatcher),
            thresholds,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            think_time,
            tick,
            request_timeout,
            seed: self.seed,
        })
    }
}

fn validate_base_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|_| Error::InvalidBaseUrl(raw.to_string()))?;
    if parsed.scheme() != "http" || parsed.host_str().is_none() {
        return Err(Error::InvalidBaseUrl(raw.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Scenario, ScenarioContext, ScenarioError};

    struct Noop;

    #[async_trait::async_trait]
    impl Scenario for Noop {
        async fn run(&self, _ctx: &mut ScenarioContext) -> std::result::Result<(), ScenarioError> {
            Ok(())
        }
    }

    fn base() -> RunPlanBuilder {
        RunPlan::builder()
            .stage(Duration::from_secs(1), 2)
            .scenario(WeightedScenario::new("noop", 1.0, Noop))
    }

    #[test]
    fn applies_defaults() {
        let plan = base().build().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.base_url(), DEFAULT_BASE_URL);
        assert_eq!(plan.tick(), DEFAULT_TICK);
        assert_eq!(plan.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert!(plan.think_time().is_zero());
        assert_eq!(plan.seed(), None);
        assert_eq!(plan.scenarios().len(), 1);
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let plan = base()
            .base_url("http://127.0.0.1:9000/")
            .build()
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn rejects_invalid_configuration() {
        let cases: Vec<(RunPlanBuilder, fn(&Error) -> bool)> = vec![
            (
                RunPlan::builder().scenario(WeightedScenario::new("noop", 1.0, Noop)),
                |e| matches!(e, Error::InvalidStages),
            ),
            (
                RunPlan::builder().stage(Duration::from_secs(1), 1),
                |e| matches!(e, Error::NoScenarios),
            ),
            (
                base().scenario(WeightedScenario::new("noop", 1.0, Noop)),
                |e| matches!(e, Error::DuplicateScenario(_)),
            ),
            (
                base().scenario(WeightedScenario::new("", 1.0, Noop)),
                |e| matches!(e, Error::EmptyScenarioName),
            ),
            (
                base().scenario(WeightedScenario::new("zero", 0.0, Noop)),
                |e| matches!(e, Error::InvalidWeight { .. }),
            ),
            (
                base().threshold("http_req_duration", "p(95)"),
                |e| matches!(e, Error::InvalidThreshold { .. }),
            ),
            (
                base().base_url("https://example.com"),
                |e| matches!(e, Error::InvalidBaseUrl(_)),
            ),
            (
                base().think_time(Duration::from_secs(3), Duration::from_secs(1)),
                |e| matches!(e, Error::InvalidThinkTime { .. }),
            ),
            (
                base().stage(Duration::from_secs(u64::MAX), 1),
                |e| matches!(e, Error::StagesTooLong { index: 1 }),
            ),
            (
                base()
                    .scenario(WeightedScenario::new("huge-a", 1e308, Noop))
                    .scenario(WeightedScenario::new("huge-b", 1e308, Noop)),
                |e| matches!(e, Error::InvalidWeight { .. }),
            ),
            (base().tick(Duration::ZERO), |e| matches!(e, Error::InvalidTick)),
            (
                base().request_timeout(Duration::ZERO),
                |e| matches!(e, Error::InvalidRequestTimeout),
            ),
        ];

        for (i, (builder, expected)) in cases.into_iter().enumerate() {
            match builder.build() {
                Err(e) => assert!(expected(&e), "case {i}: unexpected error {e}"),
                Ok(_) => panic!("case {i}: expected an error"),
            }
        }
    }
}
