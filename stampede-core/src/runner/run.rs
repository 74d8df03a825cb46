use std::sync::Arc;
use std::time::Instant;

use stampede_metrics::Registry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::progress::{ProgressFn, ProgressUpdate, RateTracker};
use super::signal::Signal;
use super::vu::{VuShared, Worker, spawn_vu};
use crate::error::Result;
use crate::http::HttpClient;
use crate::iteration_metrics::IterationMetrics;
use crate::plan::RunPlan;
use crate::request_metrics::RequestMetrics;
use crate::summary::RunReport;
use crate::thresholds_eval;

/// A run in progress.
#[derive(Debug)]
pub struct RunHandle {
    stop: Arc<Signal>,
    task: JoinHandle<Result<RunReport>>,
}

impl RunHandle {
    /// Stops spawning workers, lets in-flight iterations finish and then reports.
    pub fn cancel(&self) {
        self.stop.fire();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<RunReport> {
        self.task.await?
    }

    /// Waits for the run, cancelling it once `cancel` resolves first.
    pub async fn wait_or_cancel<F>(mut self, cancel: F) -> Result<RunReport>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            res = &mut self.task => return res?,
            () = cancel => {
                tracing::info!("cancel requested; draining");
                self.stop.fire();
            }
        }
        self.task.await?
    }
}

/// Starts `plan` on the current tokio runtime.
pub fn start(plan: RunPlan) -> RunHandle {
    start_with_progress(plan, None)
}

pub fn start_with_progress(plan: RunPlan, progress: Option<ProgressFn>) -> RunHandle {
    let stop = Arc::new(Signal::new());
    let task = tokio::spawn(drive(plan, stop.clone(), progress));
    RunHandle { stop, task }
}

/// Runs `plan` to completion.
pub async fn run(plan: RunPlan) -> Result<RunReport> {
    start(plan).wait().await
}

async fn drive(plan: RunPlan, stop: Arc<Signal>, progress: Option<ProgressFn>) -> Result<RunReport> {
    let metrics = Arc::new(Registry::new());
    let requests = RequestMetrics::register(&metrics)?;
    let iterations = IterationMetrics::register(&metrics)?;

    // Workers get their own stop signal so a cancel and the end of the schedule drain the same way.
    let vu_stop = Arc::new(Signal::new());
    let shared = Arc::new(VuShared {
        dispatcher: plan.dispatcher.clone(),
        base_url: plan.base_url.clone(),
        think_time: plan.think_time,
        seed: plan.seed,
        metrics: metrics.clone(),
        client: HttpClient::new(plan.request_timeout),
        requests: requests.clone(),
        iterations: iterations.clone(),
        stop: vu_stop.clone(),
    });

    let schedule = plan.schedule.clone();
    let total = schedule.total_duration();
    tracing::info!(
        stages = schedule.stages().len(),
        total_duration = ?total,
        max_vus = schedule.max_target(),
        scenarios = plan.dispatcher.len(),
        base_url = %plan.base_url,
        "run started"
    );

    let started = Instant::now();
    let deadline = tokio::time::Instant::from_std(started).checked_add(total);

    let mut interval = tokio::time::interval(plan.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut pool = WorkerPool::default();
    let mut rates = RateTracker::default();
    let mut tick: u64 = 0;

    let cancelled = loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = sleep_until_deadline(deadline) => break false,
            _ = stop.wait() => break true,
        }

        let elapsed = started.elapsed();
        if schedule.is_done(elapsed) {
            break false;
        }

        pool.reap().await;
        let target = schedule.target_at(elapsed);
        pool.reconcile(&shared, target);

        if let Some(progress) = &progress {
            tick += 1;
            let live = rates.update(
                elapsed,
                requests.requests_total(),
                requests.failed_total(),
                iterations.iterations_total(),
            );
            progress(ProgressUpdate {
                tick,
                elapsed,
                total_duration: total,
                stage: schedule.stage_snapshot_at(elapsed),
                target_vus: target,
                live_vus: u64::try_from(iterations.live_vus()).unwrap_or(0),
                max_vus: schedule.max_target(),
                metrics: live,
            });
        }
    };

    tracing::debug!(cancelled, live = pool.len(), "draining workers");
    vu_stop.fire();
    pool.drain().await;

    let elapsed = started.elapsed();
    let snapshot = metrics.snapshot();
    let thresholds = thresholds_eval::evaluate(&snapshot, &plan.thresholds);

    tracing::info!(
        elapsed = ?elapsed,
        cancelled,
        requests = requests.requests_total(),
        failed = requests.failed_total(),
        thresholds_passed = thresholds.overall_pass,
        "run finished"
    );

    Ok(RunReport {
        elapsed,
        cancelled,
        metrics: snapshot,
        thresholds,
    })
}

/// Active workers in spawn order, plus retired ones still finishing their iteration.
#[derive(Debug, Default)]
struct WorkerPool {
    active: Vec<Worker>,
    retiring: Vec<Worker>,
    next_id: u64,
}

impl WorkerPool {
    fn len(&self) -> usize {
        self.active.len() + self.retiring.len()
    }

    fn reconcile(&mut self, shared: &Arc<VuShared>, target: u64) {
        let target = usize::try_from(target).unwrap_or(usize::MAX);

        while self.active.len() < target {
            let id = self.next_id;
            self.next_id += 1;
            tracing::debug!(vu = id, "spawning vu");
            self.active.push(spawn_vu(shared, id));
        }

        // Retire the most recently spawned workers first.
        while self.active.len() > target {
            let Some(worker) = self.active.pop() else {
                break;
            };
            tracing::debug!(vu = worker.id, "retiring vu");
            worker.retire.fire();
            self.retiring.push(worker);
        }
    }

    /// Drops finished workers. A finished active worker panicked; the next reconcile replaces it.
    async fn reap(&mut self) {
        let mut finished = Vec::new();
        for list in [&mut self.active, &mut self.retiring] {
            let (done, running): (Vec<_>, Vec<_>) =
                list.drain(..).partition(|w| w.handle.is_finished());
            *list = running;
            finished.extend(done);
        }
        for worker in finished {
            join_worker(worker).await;
        }
    }

    async fn drain(&mut self) {
        for worker in self.active.drain(..).chain(self.retiring.drain(..)) {
            worker.retire.fire();
            join_worker(worker).await;
        }
    }
}

/// Sleeps until `deadline`; a deadline past the clock's range never fires.
async fn sleep_until_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn join_worker(worker: Worker) {
    if let Err(e) = worker.handle.await
        && e.is_panic()
    {
        tracing::warn!(vu = worker.id, "vu panicked; its iteration was recorded as failed");
    }
}
