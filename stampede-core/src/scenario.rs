use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use stampede_metrics::Registry;

use crate::http::{self, HttpClient, HttpRequest, HttpResponse};
use crate::request_metrics::{RequestMetrics, RequestSample};
use crate::runner::signal::Signal;
use crate::think_time::ThinkTime;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The request failed before a response arrived. Already counted as a failed request.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: http::Error,
    },

    #[error(transparent)]
    Http(#[from] http::Error),

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error(transparent)]
    Metrics(#[from] stampede_metrics::Error),

    #[error("{0}")]
    Failed(String),
}

impl ScenarioError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Whether the failure was already recorded as a failed request.
    pub fn is_recorded_request(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

/// A unit of work one virtual user runs per iteration.
#[async_trait]
pub trait Scenario: Send + Sync + 'static {
    async fn run(&self, ctx: &mut ScenarioContext) -> Result<(), ScenarioError>;
}

/// A scenario with its dispatch weight and optional think time override.
#[derive(Clone)]
pub struct WeightedScenario {
    pub name: Arc<str>,
    pub weight: f64,
    pub think_time: Option<ThinkTime>,
    pub scenario: Arc<dyn Scenario>,
}

impl WeightedScenario {
    pub fn new(name: impl Into<Arc<str>>, weight: f64, scenario: impl Scenario) -> Self {
        Self {
            name: name.into(),
            weight,
            think_time: None,
            scenario: Arc::new(scenario),
        }
    }

    pub fn with_think_time(mut self, think_time: ThinkTime) -> Self {
        self.think_time = Some(think_time);
        self
    }
}

impl fmt::Debug for WeightedScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedScenario")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("think_time", &self.think_time)
            .finish_non_exhaustive()
    }
}

/// Per-worker state handed to [`Scenario::run`]. Lives as long as the worker, so the RNG
/// stream continues across iterations.
pub struct ScenarioContext {
    pub(crate) vu_id: u64,
    pub(crate) iteration: u64,
    pub(crate) scenario: Arc<str>,
    base_url: Arc<str>,
    rng: StdRng,
    metrics: Arc<Registry>,
    client: HttpClient,
    requests: RequestMetrics,
    stop: Arc<Signal>,
}

impl ScenarioContext {
    /// Standalone context, outside of a run. `base_url` is used as given.
    pub fn new(
        base_url: impl Into<Arc<str>>,
        metrics: Arc<Registry>,
        client: HttpClient,
        rng: StdRng,
    ) -> stampede_metrics::Result<Self> {
        let requests = RequestMetrics::register(&metrics)?;
        Ok(Self::with_parts(
            0,
            base_url.into(),
            metrics,
            client,
            requests,
            rng,
            Arc::new(Signal::new()),
        ))
    }

    pub(crate) fn with_parts(
        vu_id: u64,
        base_url: Arc<str>,
        metrics: Arc<Registry>,
        client: HttpClient,
        requests: RequestMetrics,
        rng: StdRng,
        stop: Arc<Signal>,
    ) -> Self {
        Self {
            vu_id,
            iteration: 0,
            scenario: Arc::from(""),
            base_url,
            rng,
            metrics,
            client,
            requests,
            stop,
        }
    }

    pub fn vu_id(&self) -> u64 {
        self.vu_id
    }

    /// Zero-based iteration number of this worker.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn metrics(&self) -> &Arc<Registry> {
        &self.metrics
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Sends `req` and records the built-in request metrics, plus `trend` (in ms) when given.
    ///
    /// Non-2xx responses are returned as `Ok` and counted as failed requests.
    pub async fn send(
        &self,
        req: HttpRequest,
        trend: Option<&str>,
    ) -> Result<HttpResponse, ScenarioError> {
        let url = req.url.clone();
        match self.client.request(req).await {
            Ok(res) => {
                self.requests.record_request(RequestSample {
                    ok: res.is_success(),
                    latency: Some(res.elapsed),
                });
                if let Some(trend) = trend {
                    self.metrics.record_duration(trend, res.elapsed)?;
                }
                Ok(res)
            }
            Err(source) => {
                tracing::debug!(vu = self.vu_id, %url, error = %source, "request failed");
                self.requests.record_request(RequestSample {
                    ok: false,
                    latency: None,
                });
                Err(ScenarioError::Request { url, source })
            }
        }
    }

    pub async fn get(&self, path: &str, trend: Option<&str>) -> Result<HttpResponse, ScenarioError> {
        self.send(HttpRequest::get(self.url(path)), trend).await
    }

    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        trend: Option<&str>,
    ) -> Result<HttpResponse, ScenarioError> {
        let req = HttpRequest::new(::http::Method::POST, self.url(path)).json(body)?;
        self.send(req, trend).await
    }

    pub async fn put_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        trend: Option<&str>,
    ) -> Result<HttpResponse, ScenarioError> {
        let req = HttpRequest::new(::http::Method::PUT, self.url(path)).json(body)?;
        self.send(req, trend).await
    }

    pub async fn delete(
        &self,
        path: &str,
        trend: Option<&str>,
    ) -> Result<HttpResponse, ScenarioError> {
        self.send(HttpRequest::delete(self.url(path)), trend).await
    }

    /// Records a named check and returns `ok`.
    pub fn check(&self, name: &str, ok: bool) -> bool {
        if let Err(e) = self.metrics.record_check(name, ok) {
            tracing::warn!(check = name, error = %e, "failed to record check");
        }
        ok
    }

    pub fn record_trend(&self, name: &str, value: f64) -> Result<(), ScenarioError> {
        Ok(self.metrics.record_value(name, value)?)
    }

    /// Sleeps for `d`, returning early when the run is stopping.
    pub async fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(d) => {}
            _ = self.stop.wait() => {}
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_fired()
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
