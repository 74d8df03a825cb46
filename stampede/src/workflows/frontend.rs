use std::time::Duration;

use stampede_core::{Scenario, ScenarioContext, ScenarioError, async_trait};

use super::{Step, WorkflowOptions};

const HOMEPAGE: Step = Step {
    status_check: "homepage status is 200",
    latency_check: "homepage response time < 1000ms",
    budget: Duration::from_millis(1000),
};
const STATIC_ASSETS: Step = Step {
    status_check: "static assets status is 200",
    latency_check: "static assets response time < 500ms",
    budget: Duration::from_millis(500),
};

#[derive(Debug)]
pub(crate) struct Frontend {
    options: WorkflowOptions,
}

impl Frontend {
    pub(crate) fn new(options: WorkflowOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Scenario for Frontend {
    async fn run(&self, ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
        let opts = &self.options;
        let trend = opts.trend(None);

        let res = ctx.get("/", trend).await?;
        HOMEPAGE.check(opts, ctx, &res);

        let res = ctx.get("/static/css/main.css", trend).await?;
        STATIC_ASSETS.check(opts, ctx, &res);

        Ok(())
    }
}
