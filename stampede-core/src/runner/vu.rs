use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use stampede_metrics::Registry;
use tokio::task::JoinHandle;

use super::signal::Signal;
use crate::dispatch::WeightedDispatcher;
use crate::http::HttpClient;
use crate::iteration_metrics::IterationMetrics;
use crate::request_metrics::RequestMetrics;
use crate::scenario::{ScenarioContext, WeightedScenario};
use crate::think_time::ThinkTime;

/// State every virtual user of one run shares.
#[derive(Debug)]
pub(crate) struct VuShared {
    pub(crate) dispatcher: Arc<WeightedDispatcher<WeightedScenario>>,
    pub(crate) base_url: Arc<str>,
    pub(crate) think_time: ThinkTime,
    pub(crate) seed: Option<u64>,
    pub(crate) metrics: Arc<Registry>,
    pub(crate) client: HttpClient,
    pub(crate) requests: RequestMetrics,
    pub(crate) iterations: IterationMetrics,
    /// Fired once when the whole run winds down.
    pub(crate) stop: Arc<Signal>,
}

#[derive(Debug)]
pub(crate) struct Worker {
    pub(crate) id: u64,
    pub(crate) retire: Arc<Signal>,
    pub(crate) handle: JoinHandle<()>,
}

pub(crate) fn spawn_vu(shared: &Arc<VuShared>, id: u64) -> Worker {
    let retire = Arc::new(Signal::new());
    let handle = tokio::spawn(run_vu(shared.clone(), id, retire.clone()));
    Worker { id, retire, handle }
}

/// Per-worker RNG: reproducible when the run has a seed.
pub(crate) fn vu_rng(seed: Option<u64>, vu_id: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(vu_id.wrapping_mul(0x9E37_79B9_7F4A_7C15))),
        None => StdRng::from_entropy(),
    }
}

/// Keeps the live-VU gauge honest and turns a panicking iteration into a recorded failure.
struct ActiveVuGuard<'a> {
    shared: &'a VuShared,
    iteration_started: Option<Instant>,
}

impl<'a> ActiveVuGuard<'a> {
    fn new(shared: &'a VuShared) -> Self {
        shared.iterations.vu_started();
        Self {
            shared,
            iteration_started: None,
        }
    }
}

impl Drop for ActiveVuGuard<'_> {
    fn drop(&mut self) {
        // Workers are never aborted, so dropping mid-iteration means the scenario panicked.
        if let Some(started) = self.iteration_started.take() {
            self.shared
                .iterations
                .record_iteration(false, started.elapsed());
            self.shared.requests.record_failed_iteration();
        }
        self.shared.iterations.vu_stopped();
    }
}

async fn run_vu(shared: Arc<VuShared>, vu_id: u64, retire: Arc<Signal>) {
    let mut guard = ActiveVuGuard::new(&shared);
    let mut ctx = ScenarioContext::with_parts(
        vu_id,
        shared.base_url.clone(),
        shared.metrics.clone(),
        shared.client.clone(),
        shared.requests.clone(),
        vu_rng(shared.seed, vu_id),
        shared.stop.clone(),
    );

    tracing::debug!(vu = vu_id, "vu started");

    while !retire.is_fired() && !shared.stop.is_fired() {
        let entry = shared.dispatcher.select(ctx.rng());
        ctx.scenario = entry.name.clone();

        let started = Instant::now();
        guard.iteration_started = Some(started);
        let res = entry.scenario.run(&mut ctx).await;
        guard.iteration_started = None;

        match res {
            Ok(()) => shared.iterations.record_iteration(true, started.elapsed()),
            Err(e) => {
                tracing::debug!(vu = vu_id, scenario = %entry.name, error = %e, "iteration failed");
                shared.iterations.record_iteration(false, started.elapsed());
                if !e.is_recorded_request() {
                    shared.requests.record_failed_iteration();
                }
            }
        }
        ctx.iteration += 1;

        let pause = entry
            .think_time
            .unwrap_or(shared.think_time)
            .sample(ctx.rng());
        if !pause.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = retire.wait() => {}
                _ = shared.stop.wait() => {}
            }
        }
    }

    tracing::debug!(vu = vu_id, iterations = ctx.iteration, "vu stopped");
}
