use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HOME: &str = "/";
pub const PATH_STATIC_CSS: &str = "/static/css/main.css";
pub const PATH_PRODUCTS: &str = "/api/products";
pub const PATH_PRODUCT_SEARCH: &str = "/api/products/search";
pub const PATH_PRODUCT_CATEGORIES: &str = "/api/products/categories";
pub const PATH_PRODUCT: &str = "/api/products/{id}";
pub const PATH_PRODUCTS_BY_CATEGORY: &str = "/api/products/category/{category}";
pub const PATH_CART: &str = "/api/cart/{user_id}";
pub const PATH_CART_ITEMS: &str = "/api/cart/{user_id}/items";
pub const PATH_CART_ITEM: &str = "/api/cart/{user_id}/items/{product_id}";
pub const PATH_CART_TOTAL: &str = "/api/cart/{user_id}/total";

/// Product ids the mock catalog serves.
pub const PRODUCT_IDS: [&str; 10] = [
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

const PRODUCT_NAMES: [(&str, &str, f64); 10] = [
    ("Vintage Phone", "electronics", 89.99),
    ("Travel Laptop", "electronics", 949.0),
    ("Film Camera", "photography", 129.5),
    ("Field Watch", "accessories", 109.99),
    ("Bookshelf Speaker", "electronics", 74.0),
    ("Studio Headphone", "electronics", 199.0),
    ("Drawing Tablet", "electronics", 249.99),
    ("Mechanical Keyboard", "accessories", 119.0),
    ("Wireless Mouse", "accessories", 29.99),
    ("4K Monitor", "electronics", 329.0),
];

/// Fault injection knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestServerConfig {
    /// Added to every response.
    pub latency: Duration,
    /// Answer every n-th request with a 500.
    pub fail_every: Option<u64>,
}

impl TestServerConfig {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    injected_failures: Arc<AtomicU64>,
}

impl TestServerStats {
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn injected_failures(&self) -> u64 {
        self.injected_failures.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Cart {
    user_id: String,
    items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
struct QuantityUpdate {
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug)]
struct Shop {
    products: Vec<Product>,
    carts: Mutex<HashMap<String, Vec<CartItem>>>,
}

impl Shop {
    fn new() -> Self {
        let products = PRODUCT_IDS
            .iter()
            .zip(PRODUCT_NAMES)
            .map(|(id, (name, category, price_usd))| Product {
                id: (*id).to_string(),
                name: name.to_string(),
                category: category.to_string(),
                price_usd,
            })
            .collect();
        Self {
            products,
            carts: Mutex::new(HashMap::new()),
        }
    }

    fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn cart(&self, user_id: &str) -> Cart {
        let items = self.carts.lock().get(user_id).cloned().unwrap_or_default();
        Cart {
            user_id: user_id.to_string(),
            items,
        }
    }

    fn update_cart(&self, user_id: &str, f: impl FnOnce(&mut Vec<CartItem>)) -> Cart {
        let mut carts = self.carts.lock();
        let items = carts.entry(user_id.to_string()).or_default();
        f(items);
        Cart {
            user_id: user_id.to_string(),
            items: items.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct AppState {
    shop: Arc<Shop>,
    stats: TestServerStats,
    config: TestServerConfig,
}

async fn inject_faults(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let n = state.stats.requests_total.fetch_add(1, Ordering::Relaxed) + 1;
    if !state.config.latency.is_zero() {
        sleep(state.config.latency).await;
    }
    if let Some(every) = state.config.fail_every
        && n % every == 0
    {
        state.stats.injected_failures.fetch_add(1, Ordering::Relaxed);
        return (StatusCode::INTERNAL_SERVER_ERROR, "injected failure").into_response();
    }
    next.run(req).await
}

async fn handle_home() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        "<!doctype html><html><head><link rel=\"stylesheet\" href=\"/static/css/main.css\"></head><body><h1>Shop</h1></body></html>",
    )
}

async fn handle_static_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        "body { font-family: sans-serif; }\n",
    )
}

async fn handle_products(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "products": state.shop.products }))
}

async fn handle_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, StatusCode> {
    state
        .shop
        .product(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<serde_json::Value> {
    let needle = query.q.to_ascii_lowercase();
    let results: Vec<&Product> = state
        .shop
        .products
        .iter()
        .filter(|p| p.name.to_ascii_lowercase().contains(&needle))
        .collect();
    Json(serde_json::json!({ "results": results }))
}

async fn handle_categories(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut categories: Vec<&str> = state
        .shop
        .products
        .iter()
        .map(|p| p.category.as_str())
        .collect();
    categories.sort_unstable();
    categories.dedup();
    Json(serde_json::json!({ "categories": categories }))
}

async fn handle_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Json<serde_json::Value> {
    let products: Vec<&Product> = state
        .shop
        .products
        .iter()
        .filter(|p| p.category == category)
        .collect();
    Json(serde_json::json!({ "products": products }))
}

async fn handle_get_cart(State(state): State<AppState>, Path(user_id): Path<String>) -> Json<Cart> {
    Json(state.shop.cart(&user_id))
}

async fn handle_add_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(item): Json<CartItem>,
) -> Result<Json<Cart>, StatusCode> {
    if state.shop.product(&item.product_id).is_none() || item.quantity == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(state.shop.update_cart(&user_id, |items| {
        match items.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => items.push(item),
        }
    })))
}

async fn handle_update_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
    Json(update): Json<QuantityUpdate>,
) -> Json<Cart> {
    Json(state.shop.update_cart(&user_id, |items| {
        if update.quantity == 0 {
            items.retain(|i| i.product_id != product_id);
        } else if let Some(existing) = items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = update.quantity;
        } else {
            items.push(CartItem {
                product_id,
                quantity: update.quantity,
            });
        }
    }))
}

async fn handle_remove_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> Json<Cart> {
    Json(state.shop.update_cart(&user_id, |items| {
        items.retain(|i| i.product_id != product_id);
    }))
}

async fn handle_clear_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Cart> {
    Json(state.shop.update_cart(&user_id, Vec::clear))
}

async fn handle_cart_total(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    let cart = state.shop.cart(&user_id);
    let total: f64 = cart
        .items
        .iter()
        .filter_map(|i| {
            state
                .shop
                .product(&i.product_id)
                .map(|p| p.price_usd * f64::from(i.quantity))
        })
        .sum();
    Json(serde_json::json!({ "user_id": user_id, "total": total }))
}

pub fn router(stats: TestServerStats, config: TestServerConfig) -> Router {
    let state = AppState {
        shop: Arc::new(Shop::new()),
        stats,
        config,
    };

    Router::new()
        .route(PATH_HOME, get(handle_home))
        .route(PATH_STATIC_CSS, get(handle_static_css))
        .route(PATH_PRODUCTS, get(handle_products))
        .route(PATH_PRODUCT_SEARCH, get(handle_search))
        .route(PATH_PRODUCT_CATEGORIES, get(handle_categories))
        .route(PATH_PRODUCTS_BY_CATEGORY, get(handle_by_category))
        .route(PATH_PRODUCT, get(handle_product))
        .route(PATH_CART, get(handle_get_cart))
        .route(
            PATH_CART_ITEMS,
            post(handle_add_item).delete(handle_clear_cart),
        )
        .route(
            PATH_CART_ITEM,
            put(handle_update_item).delete(handle_remove_item),
        )
        .route(PATH_CART_TOTAL, get(handle_cart_total))
        .layer(middleware::from_fn_with_state(state.clone(), inject_faults))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerConfig::default()).await
    }

    pub async fn start_with(config: TestServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone(), config);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
