use std::time::Duration;

use stampede_core::{Scenario, ScenarioContext, ScenarioError, async_trait};

use super::{PRODUCT_IDS, SEARCH_TERMS, Step, WorkflowOptions, check_body, pick};

const CATALOG_RESPONSE_TIME: &str = "catalog_response_time";
const PRODUCT_DETAIL_TIME: &str = "product_detail_time";
const PRODUCT_SEARCH_TIME: &str = "product_search_time";

const BROWSE_CATEGORY: &str = "electronics";

const LIST_PRODUCTS: Step = Step {
    status_check: "get all products status is 200",
    latency_check: "get all products response time < 500ms",
    budget: Duration::from_millis(500),
};
const GET_PRODUCT: Step = Step {
    status_check: "get product by id status is 200",
    latency_check: "get product by id response time < 200ms",
    budget: Duration::from_millis(200),
};
const SEARCH: Step = Step {
    status_check: "search products status is 200",
    latency_check: "search products response time < 400ms",
    budget: Duration::from_millis(400),
};
const CATEGORIES: Step = Step {
    status_check: "get categories status is 200",
    latency_check: "get categories response time < 300ms",
    budget: Duration::from_millis(300),
};
const BY_CATEGORY: Step = Step {
    status_check: "get products by category status is 200",
    latency_check: "get products by category response time < 400ms",
    budget: Duration::from_millis(400),
};

fn has_non_empty_array(body: &serde_json::Value, key: &str) -> bool {
    body.get(key)
        .and_then(serde_json::Value::as_array)
        .is_some_and(|a| !a.is_empty())
}

fn has_array(body: &serde_json::Value, key: &str) -> bool {
    body.get(key).is_some_and(serde_json::Value::is_array)
}

/// Quick catalog pass: list, detail, search. No pauses inside the iteration.
#[derive(Debug)]
pub(crate) struct Catalog {
    options: WorkflowOptions,
}

impl Catalog {
    pub(crate) fn new(options: WorkflowOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Scenario for Catalog {
    async fn run(&self, ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
        let opts = &self.options;

        let res = ctx
            .get("/api/products", opts.trend(Some(CATALOG_RESPONSE_TIME)))
            .await?;
        LIST_PRODUCTS.check(opts, ctx, &res);

        let product_id = pick(ctx.rng(), &PRODUCT_IDS);
        let res = ctx
            .get(
                &format!("/api/products/{product_id}"),
                opts.trend(Some(PRODUCT_DETAIL_TIME)),
            )
            .await?;
        GET_PRODUCT.check(opts, ctx, &res);

        let term = pick(ctx.rng(), &SEARCH_TERMS);
        let res = ctx
            .get(
                &format!("/api/products/search?q={term}"),
                opts.trend(Some(PRODUCT_SEARCH_TIME)),
            )
            .await?;
        SEARCH.check(opts, ctx, &res);

        Ok(())
    }
}

/// Full catalog session with body checks and a pause after each step.
#[derive(Debug)]
pub(crate) struct CatalogBrowse {
    options: WorkflowOptions,
}

impl CatalogBrowse {
    pub(crate) fn new(options: WorkflowOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Scenario for CatalogBrowse {
    async fn run(&self, ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
        let opts = &self.options;

        let res = ctx
            .get("/api/products", opts.trend(Some(CATALOG_RESPONSE_TIME)))
            .await?;
        LIST_PRODUCTS.check(opts, ctx, &res);
        check_body(opts, ctx, "get all products has products array", &res, |b| {
            has_non_empty_array(b, "products")
        });
        opts.pause(ctx).await;

        let product_id = pick(ctx.rng(), &PRODUCT_IDS);
        let res = ctx
            .get(
                &format!("/api/products/{product_id}"),
                opts.trend(Some(PRODUCT_DETAIL_TIME)),
            )
            .await?;
        GET_PRODUCT.check(opts, ctx, &res);
        check_body(opts, ctx, "get product by id has product data", &res, |b| {
            ["id", "name", "price_usd"]
                .iter()
                .all(|k| b.get(k).is_some_and(|v| !v.is_null()))
        });
        opts.pause(ctx).await;

        let term = pick(ctx.rng(), &SEARCH_TERMS);
        let res = ctx
            .get(
                &format!("/api/products/search?q={term}"),
                opts.trend(Some(PRODUCT_SEARCH_TIME)),
            )
            .await?;
        SEARCH.check(opts, ctx, &res);
        check_body(opts, ctx, "search products has results", &res, |b| {
            has_array(b, "results")
        });
        opts.pause(ctx).await;

        let res = ctx
            .get(
                "/api/products/categories",
                opts.trend(Some(CATALOG_RESPONSE_TIME)),
            )
            .await?;
        CATEGORIES.check(opts, ctx, &res);
        check_body(opts, ctx, "get categories has categories array", &res, |b| {
            has_array(b, "categories")
        });
        opts.pause(ctx).await;

        let res = ctx
            .get(
                &format!("/api/products/category/{BROWSE_CATEGORY}"),
                opts.trend(Some(CATALOG_RESPONSE_TIME)),
            )
            .await?;
        BY_CATEGORY.check(opts, ctx, &res);
        check_body(opts, ctx, "get products by category has products", &res, |b| {
            has_array(b, "products")
        });

        Ok(())
    }
}
