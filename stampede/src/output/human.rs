use std::path::Path;
use std::sync::Arc;

use stampede_core::{ProgressFn, ProgressUpdate, RunPlan, RunReport};

mod format;
mod progress;
mod summary;

use format::{format_duration, format_percent, format_rate};
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, plan_path: &Path, plan: &RunPlan) {
        let schedule = plan.schedule();
        println!("plan: {}", plan_path.display());
        println!("base_url: {}", plan.base_url());
        println!(
            "stages: {} total={} peak_vus={} ramp={}",
            schedule.stages().len(),
            format_duration(schedule.total_duration()),
            schedule.max_target(),
            schedule.ramp()
        );

        let total_weight: f64 = plan.scenarios().iter().map(|s| s.weight).sum();
        for s in plan.scenarios() {
            println!(
                "scenario: {} weight={} ({})",
                s.name,
                s.weight,
                format_percent(s.weight / total_weight)
            );
        }
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();
        Some(Arc::new(move |u: ProgressUpdate| {
            let message = progress_message(&u);
            progress.update(u.total_duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, report: &RunReport) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(report));
        Ok(())
    }
}

fn progress_message(u: &ProgressUpdate) -> String {
    let stage = match &u.stage {
        Some(s) => format!(
            "stage={}/{} stage_remaining={} ",
            s.index + 1,
            s.count,
            format_duration(s.stage_remaining)
        ),
        None => String::new(),
    };
    format!(
        "{stage}target={} vus={}/{} elapsed={} rps={} errors={} requests={}",
        u.target_vus,
        u.live_vus,
        u.max_vus,
        format_duration(u.elapsed),
        format_rate(u.metrics.rps_now),
        format_percent(u.metrics.error_rate_now),
        u.metrics.requests_total
    )
}
