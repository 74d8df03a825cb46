use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use stampede_core::{RunPlanBuilder, StageRamp, ThinkTime, WeightedScenario};

use crate::workflows::{Workflow, WorkflowOptions};

/// A YAML run plan as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct PlanFile {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub ramp: Option<String>,

    pub stages: Vec<StageYaml>,

    /// Default think time between iterations.
    #[serde(default)]
    pub think_time: Option<ThinkTimeYaml>,

    pub scenarios: Vec<ScenarioYaml>,

    #[serde(default)]
    pub thresholds: BTreeMap<String, ThresholdExprYaml>,

    #[serde(default)]
    pub request_timeout: Option<YamlDuration>,

    #[serde(default)]
    pub tick: Option<YamlDuration>,

    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct StageYaml {
    pub duration: YamlDuration,
    pub target: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ScenarioYaml {
    pub name: String,

    /// Built-in workflow; defaults to `name`.
    #[serde(default)]
    pub workflow: Option<String>,

    pub weight: f64,

    #[serde(default)]
    pub think_time: Option<ThinkTimeYaml>,

    /// Pause between steps inside one iteration (multi-step workflows).
    #[serde(default)]
    pub step_delay: Option<ThinkTimeYaml>,

    /// Record every request of this scenario into one custom trend.
    #[serde(default)]
    pub trend: Option<String>,

    /// Namespace for check names, e.g. `cart` gives `cart - get cart status is 200`.
    #[serde(default)]
    pub check_prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ThinkTimeYaml {
    pub min: YamlDuration,
    pub max: YamlDuration,
}

impl ThinkTimeYaml {
    fn to_think_time(self) -> stampede_core::Result<ThinkTime> {
        ThinkTime::new(self.min.into_inner(), self.max.into_inner())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ThresholdExprYaml {
    One(String),
    Many(Vec<String>),
}

impl ThresholdExprYaml {
    fn exprs(&self) -> &[String] {
        match self {
            Self::One(expr) => std::slice::from_ref(expr),
            Self::Many(exprs) => exprs,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    pub(crate) fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 2m, 500ms), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(|secs| YamlDuration(Duration::from_secs(secs)))
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Duration::try_from_secs_f64(v)
                    .map(YamlDuration)
                    .map_err(|e| E::custom(format!("invalid duration {v}: {e}")))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                crate::cli::parse_duration(v)
                    .map(YamlDuration)
                    .map_err(E::custom)
            }
        }

        deserializer.deserialize_any(V)
    }
}

impl PlanFile {
    pub(crate) fn parse(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("failed to parse plan YAML")
    }

    pub(crate) async fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read plan: {}", path.display()))?;
        Self::parse(&yaml).with_context(|| format!("invalid plan: {}", path.display()))
    }

    /// Everything except the base URL, which the caller resolves.
    pub(crate) fn to_builder(&self) -> anyhow::Result<RunPlanBuilder> {
        let mut builder = stampede_core::RunPlan::builder().stages(
            self.stages
                .iter()
                .map(|s| stampede_core::Stage::new(s.duration.into_inner(), s.target)),
        );

        if let Some(ramp) = &self.ramp {
            let ramp = StageRamp::from_str(ramp)
                .map_err(|_| anyhow::anyhow!("unknown ramp `{ramp}` (expected linear or step)"))?;
            builder = builder.ramp(ramp);
        }

        if let Some(tt) = self.think_time {
            builder = builder.think_time(tt.min.into_inner(), tt.max.into_inner());
        }

        for s in &self.scenarios {
            builder = builder.scenario(scenario_from_yaml(s)?);
        }

        for (metric, exprs) in &self.thresholds {
            for expr in exprs.exprs() {
                builder = builder.threshold(metric.as_str(), expr.as_str());
            }
        }

        if let Some(d) = self.request_timeout {
            builder = builder.request_timeout(d.into_inner());
        }
        if let Some(d) = self.tick {
            builder = builder.tick(d.into_inner());
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }

        Ok(builder)
    }
}

fn scenario_from_yaml(s: &ScenarioYaml) -> anyhow::Result<WeightedScenario> {
    let workflow_name = s.workflow.as_deref().unwrap_or(&s.name);
    let workflow = Workflow::from_str(workflow_name).map_err(|_| {
        anyhow::anyhow!(
            "scenario `{}`: unknown workflow `{workflow_name}` (see `stampede list-workflows`)",
            s.name
        )
    })?;

    let step_delay = s
        .step_delay
        .map(ThinkTimeYaml::to_think_time)
        .transpose()
        .with_context(|| format!("scenario `{}`: invalid stepDelay", s.name))?
        .unwrap_or_default();

    let options = WorkflowOptions {
        trend: s.trend.as_deref().map(Arc::from),
        step_delay,
        check_prefix: s
            .check_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Arc::from),
    };

    let mut scenario = WeightedScenario {
        name: Arc::from(s.name.as_str()),
        weight: s.weight,
        think_time: None,
        scenario: workflow.build(options),
    };
    if let Some(tt) = s.think_time {
        let tt = tt
            .to_think_time()
            .with_context(|| format!("scenario `{}`: invalid thinkTime", s.name))?;
        scenario = scenario.with_think_time(tt);
    }
    Ok(scenario)
}
