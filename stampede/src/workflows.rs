//! Built-in workflows a plan can reference by name.
//!
//! Each workflow drives the catalog, cart or frontend endpoints of the target
//! service, records `checks` for status and latency budgets, and sends request
//! durations into a per-step trend (or one shared trend when a plan overrides it).

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use stampede_core::{HttpResponse, Scenario, ScenarioContext, ThinkTime};

mod cart;
mod catalog;
mod frontend;

pub(crate) const PRODUCT_IDS: [&str; 10] = [
    "OLJCESPC7Z",
    "66VCHSJNUP",
    "1YMWWN1N4O",
    "2ZYFJ3GM2N",
    "0PUK6V6EV0",
    "LS4PSXUNUM",
    "9SIQT8TOJO",
    "6E92ZMYYFZ",
    "L9ECAV7KIM",
    "2LS3EF2PRP",
];

pub(crate) const USER_IDS: [&str; 10] = [
    "user-001", "user-002", "user-003", "user-004", "user-005", "user-006", "user-007",
    "user-008", "user-009", "user-010",
];

pub(crate) const SEARCH_TERMS: [&str; 10] = [
    "phone",
    "laptop",
    "camera",
    "watch",
    "speaker",
    "headphone",
    "tablet",
    "keyboard",
    "mouse",
    "monitor",
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum Workflow {
    /// List products, open one, search.
    Catalog,
    /// Products, detail, search, categories, one category page.
    CatalogBrowse,
    /// Get cart, add an item, read the total, sometimes remove the item.
    Cart,
    /// Get, add, re-read, update, remove, add 1-3 items, total, sometimes clear.
    CartJourney,
    /// Homepage and a static stylesheet.
    Frontend,
}

impl Workflow {
    pub(crate) fn description(self) -> &'static str {
        match self {
            Self::Catalog => "list products, fetch one product, search",
            Self::CatalogBrowse => {
                "list products, fetch one product, search, list categories, browse a category"
            }
            Self::Cart => "get cart, add item, get total, remove the item 30% of the time",
            Self::CartJourney => {
                "get, add, re-read, update, remove, add 1-3 items, total, clear the cart 30% of the time"
            }
            Self::Frontend => "homepage and static stylesheet",
        }
    }

    pub(crate) fn build(self, options: WorkflowOptions) -> Arc<dyn Scenario> {
        match self {
            Self::Catalog => Arc::new(catalog::Catalog::new(options)),
            Self::CatalogBrowse => Arc::new(catalog::CatalogBrowse::new(options)),
            Self::Cart => Arc::new(cart::Cart::new(options)),
            Self::CartJourney => Arc::new(cart::CartJourney::new(options)),
            Self::Frontend => Arc::new(frontend::Frontend::new(options)),
        }
    }
}

/// Per-scenario knobs a plan can set on a workflow.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkflowOptions {
    /// Replaces every step's own trend.
    pub(crate) trend: Option<Arc<str>>,
    /// Pause between steps inside one iteration. Zero disables all in-iteration pauses.
    pub(crate) step_delay: ThinkTime,
    /// Prepended to every check name as `"{prefix} - {check}"`.
    pub(crate) check_prefix: Option<Arc<str>>,
}

impl WorkflowOptions {
    fn trend<'a>(&'a self, step_default: Option<&'a str>) -> Option<&'a str> {
        self.trend.as_deref().or(step_default)
    }

    fn check_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match &self.check_prefix {
            Some(prefix) => Cow::Owned(format!("{prefix} - {name}")),
            None => Cow::Borrowed(name),
        }
    }

    async fn pause(&self, ctx: &mut ScenarioContext) {
        let d = self.step_delay.sample(ctx.rng());
        ctx.sleep(d).await;
    }

    /// Short fixed pause between repeated calls of the same step.
    async fn short_pause(&self, ctx: &ScenarioContext, d: Duration) {
        if !self.step_delay.is_zero() {
            ctx.sleep(d).await;
        }
    }
}

/// Check names and latency budget of one workflow step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    pub(crate) status_check: &'static str,
    pub(crate) latency_check: &'static str,
    pub(crate) budget: Duration,
}

impl Step {
    /// Records the status and latency checks; returns whether the status was 200.
    pub(crate) fn check(
        &self,
        opts: &WorkflowOptions,
        ctx: &ScenarioContext,
        res: &HttpResponse,
    ) -> bool {
        ctx.check(&opts.check_name(self.latency_check), res.elapsed < self.budget);
        ctx.check(&opts.check_name(self.status_check), res.status == 200)
    }
}

/// Records `name` as passed when the body is JSON and `f` accepts it.
pub(crate) fn check_body(
    opts: &WorkflowOptions,
    ctx: &ScenarioContext,
    name: &str,
    res: &HttpResponse,
    f: impl FnOnce(&serde_json::Value) -> bool,
) -> bool {
    let ok = res
        .json::<serde_json::Value>()
        .map(|body| f(&body))
        .unwrap_or(false);
    ctx.check(&opts.check_name(name), ok)
}

pub(crate) fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    match items.len() {
        0 => "",
        n => items[rng.gen_range(0..n)],
    }
}

pub(crate) fn random_quantity(rng: &mut StdRng) -> u32 {
    rng.gen_range(1..=5)
}
