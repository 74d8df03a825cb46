use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use stampede_core::{Scenario, ScenarioContext, ScenarioError, async_trait};

use super::{PRODUCT_IDS, USER_IDS, Step, WorkflowOptions, check_body, pick, random_quantity};

const CART_RESPONSE_TIME: &str = "cart_response_time";
const ADD_ITEM_TIME: &str = "add_item_time";
const GET_CART_TIME: &str = "get_cart_time";
const REMOVE_ITEM_TIME: &str = "remove_item_time";
const CLEAR_CART_TIME: &str = "clear_cart_time";

/// Share of iterations that end by removing the item (quick) or clearing the cart (journey).
const CLEANUP_PROBABILITY: f64 = 0.3;
const ITEM_PAUSE: Duration = Duration::from_millis(500);

const GET_CART: Step = Step {
    status_check: "get cart status is 200",
    latency_check: "get cart response time < 200ms",
    budget: Duration::from_millis(200),
};
const ADD_ITEM: Step = Step {
    status_check: "add item status is 200",
    latency_check: "add item response time < 400ms",
    budget: Duration::from_millis(400),
};
const GET_CART_WITH_ITEMS: Step = Step {
    status_check: "get cart with items status is 200",
    latency_check: "get cart with items response time < 200ms",
    budget: Duration::from_millis(200),
};
const UPDATE_ITEM: Step = Step {
    status_check: "update item status is 200",
    latency_check: "update item response time < 300ms",
    budget: Duration::from_millis(300),
};
const REMOVE_ITEM: Step = Step {
    status_check: "remove item status is 200",
    latency_check: "remove item response time < 300ms",
    budget: Duration::from_millis(300),
};
const ADD_MULTIPLE_ITEMS: Step = Step {
    status_check: "add multiple items status is 200",
    latency_check: "add multiple items response time < 400ms",
    budget: Duration::from_millis(400),
};
const CART_TOTAL: Step = Step {
    status_check: "get cart total status is 200",
    latency_check: "get cart total response time < 300ms",
    budget: Duration::from_millis(300),
};
const CLEAR_CART: Step = Step {
    status_check: "clear cart status is 200",
    latency_check: "clear cart response time < 200ms",
    budget: Duration::from_millis(200),
};

#[derive(Debug, Serialize)]
struct CartItem<'a> {
    product_id: &'a str,
    quantity: u32,
}

fn belongs_to(body: &serde_json::Value, user_id: &str) -> bool {
    body.get("user_id").and_then(serde_json::Value::as_str) == Some(user_id)
}

fn items_len(body: &serde_json::Value) -> Option<usize> {
    body.get("items")
        .and_then(serde_json::Value::as_array)
        .map(Vec::len)
}

fn cleanup_roll(ctx: &mut ScenarioContext) -> bool {
    ctx.rng().gen_bool(CLEANUP_PROBABILITY)
}

/// Short cart visit: get, add, total, and a 30% chance to remove the added item.
#[derive(Debug)]
pub(crate) struct Cart {
    options: WorkflowOptions,
}

impl Cart {
    pub(crate) fn new(options: WorkflowOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Scenario for Cart {
    async fn run(&self, ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
        let opts = &self.options;
        let user_id = pick(ctx.rng(), &USER_IDS);
        let cart = format!("/api/cart/{user_id}");

        let res = ctx.get(&cart, opts.trend(Some(GET_CART_TIME))).await?;
        GET_CART.check(opts, ctx, &res);

        let product_id = pick(ctx.rng(), &PRODUCT_IDS);
        let item = CartItem {
            product_id,
            quantity: random_quantity(ctx.rng()),
        };
        let res = ctx
            .post_json(&format!("{cart}/items"), &item, opts.trend(Some(ADD_ITEM_TIME)))
            .await?;
        ADD_ITEM.check(opts, ctx, &res);

        let res = ctx
            .get(&format!("{cart}/total"), opts.trend(Some(CART_RESPONSE_TIME)))
            .await?;
        CART_TOTAL.check(opts, ctx, &res);

        if cleanup_roll(ctx) {
            let res = ctx
                .delete(
                    &format!("{cart}/items/{product_id}"),
                    opts.trend(Some(REMOVE_ITEM_TIME)),
                )
                .await?;
            REMOVE_ITEM.check(opts, ctx, &res);
        }

        Ok(())
    }
}

/// Full cart session with body checks and a pause after each step.
#[derive(Debug)]
pub(crate) struct CartJourney {
    options: WorkflowOptions,
}

impl CartJourney {
    pub(crate) fn new(options: WorkflowOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Scenario for CartJourney {
    async fn run(&self, ctx: &mut ScenarioContext) -> Result<(), ScenarioError> {
        let opts = &self.options;
        let user_id = pick(ctx.rng(), &USER_IDS);
        let cart = format!("/api/cart/{user_id}");

        let res = ctx.get(&cart, opts.trend(Some(GET_CART_TIME))).await?;
        GET_CART.check(opts, ctx, &res);
        check_body(opts, ctx, "get cart has valid response", &res, |b| {
            belongs_to(b, user_id) && items_len(b).is_some()
        });
        opts.pause(ctx).await;

        let product_id = pick(ctx.rng(), &PRODUCT_IDS);
        let item = CartItem {
            product_id,
            quantity: random_quantity(ctx.rng()),
        };
        let res = ctx
            .post_json(&format!("{cart}/items"), &item, opts.trend(Some(ADD_ITEM_TIME)))
            .await?;
        ADD_ITEM.check(opts, ctx, &res);
        check_body(opts, ctx, "add item has valid response", &res, |b| {
            belongs_to(b, user_id) && items_len(b).is_some()
        });
        opts.pause(ctx).await;

        let res = ctx.get(&cart, opts.trend(Some(GET_CART_TIME))).await?;
        GET_CART_WITH_ITEMS.check(opts, ctx, &res);
        check_body(opts, ctx, "get cart with items has items", &res, |b| {
            belongs_to(b, user_id) && items_len(b).is_some_and(|n| n > 0)
        });
        opts.pause(ctx).await;

        let update = CartItem {
            product_id,
            quantity: random_quantity(ctx.rng()),
        };
        let item_path = format!("{cart}/items/{product_id}");
        let res = ctx
            .put_json(&item_path, &update, opts.trend(Some(CART_RESPONSE_TIME)))
            .await?;
        UPDATE_ITEM.check(opts, ctx, &res);
        check_body(opts, ctx, "update item has valid response", &res, |b| {
            belongs_to(b, user_id)
        });
        opts.pause(ctx).await;

        let res = ctx
            .delete(&item_path, opts.trend(Some(REMOVE_ITEM_TIME)))
            .await?;
        REMOVE_ITEM.check(opts, ctx, &res);
        check_body(opts, ctx, "remove item has valid response", &res, |b| {
            belongs_to(b, user_id)
        });
        opts.pause(ctx).await;

        let extra_items = ctx.rng().gen_range(1..=3);
        for _ in 0..extra_items {
            let item = CartItem {
                product_id: pick(ctx.rng(), &PRODUCT_IDS),
                quantity: random_quantity(ctx.rng()),
            };
            let res = ctx
                .post_json(&format!("{cart}/items"), &item, opts.trend(Some(ADD_ITEM_TIME)))
                .await?;
            ADD_MULTIPLE_ITEMS.check(opts, ctx, &res);
            opts.short_pause(ctx, ITEM_PAUSE).await;
        }
        opts.pause(ctx).await;

        let res = ctx
            .get(&format!("{cart}/total"), opts.trend(Some(CART_RESPONSE_TIME)))
            .await?;
        CART_TOTAL.check(opts, ctx, &res);
        check_body(opts, ctx, "get cart total has valid response", &res, |b| {
            belongs_to(b, user_id) && b.get("total").is_some_and(serde_json::Value::is_number)
        });

        if cleanup_roll(ctx) {
            opts.pause(ctx).await;
            let res = ctx
                .delete(&format!("{cart}/items"), opts.trend(Some(CLEAR_CART_TIME)))
                .await?;
            CLEAR_CART.check(opts, ctx, &res);
            check_body(opts, ctx, "clear cart has valid response", &res, |b| {
                belongs_to(b, user_id)
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cart_body_predicates() {
        let body = json!({"user_id": "user-003", "items": [{"product_id": "OLJCESPC7Z", "quantity": 2}]});
        assert!(belongs_to(&body, "user-003"));
        assert!(!belongs_to(&body, "user-004"));
        assert_eq!(items_len(&body), Some(1));
        assert_eq!(items_len(&json!({"user_id": "user-003"})), None);
    }

    #[test]
    fn cart_item_wire_shape() {
        let item = CartItem {
            product_id: "66VCHSJNUP",
            quantity: 3,
        };
        assert_eq!(
            serde_json::to_value(&item).unwrap_or_else(|e| panic!("{e}")),
            json!({"product_id": "66VCHSJNUP", "quantity": 3})
        );
    }
}
