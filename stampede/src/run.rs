use anyhow::Context as _;
use std::collections::BTreeMap;

use stampede_core::{DEFAULT_BASE_URL, RunReport};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::plan::PlanFile;
use crate::run_error::RunError;

const BASE_URL_VAR: &str = "BASE_URL";

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let file = PlanFile::load(&args.plan)
        .await
        .map_err(RunError::InvalidInput)?;
    let env = env_overrides(&args.env).map_err(RunError::InvalidInput)?;

    let base_url = resolve_base_url(
        args.base_url.as_deref(),
        &env,
        std::env::var(BASE_URL_VAR).ok().as_deref(),
        file.base_url.as_deref(),
    );

    let mut builder = file
        .to_builder()
        .map_err(RunError::InvalidInput)?
        .base_url(base_url);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(tick) = args.tick {
        builder = builder.tick(tick);
    }
    let plan = builder.build()?;

    out.print_header(&args.plan, &plan);

    let handle = stampede_core::start_with_progress(plan, out.progress());
    let report = handle.wait_or_cancel(ctrl_c()).await?;

    out.print_summary(&report)
        .context("failed to write report")
        .map_err(RunError::RuntimeError)?;
    print_threshold_failures(&report);

    Ok(ExitCode::from_thresholds(report.passed()))
}

/// Resolves when Ctrl-C arrives; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn print_threshold_failures(report: &RunReport) {
    let failed: Vec<_> = report.thresholds.failures().collect();
    if failed.is_empty() {
        return;
    }

    eprintln!("thresholds_failed: {}", failed.len());
    for r in failed {
        match r.observed {
            Some(o) => eprintln!(
                "threshold_failed: metric={} expr={} observed={o}",
                r.metric, r.expression
            ),
            None => eprintln!(
                "threshold_failed: metric={} expr={} observed=-",
                r.metric, r.expression
            ),
        }
    }
}

/// `--base-url` > `--env BASE_URL` > process `BASE_URL` > plan `baseUrl` > default. Empty values count as unset.
fn resolve_base_url(
    cli: Option<&str>,
    env_overrides: &BTreeMap<String, String>,
    process: Option<&str>,
    plan: Option<&str>,
) -> String {
    [
        cli,
        env_overrides.get(BASE_URL_VAR).map(String::as_str),
        process,
        plan,
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|v| !v.is_empty())
    .unwrap_or(DEFAULT_BASE_URL)
    .to_string()
}

fn env_overrides(raw: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for s in raw {
        let (k, v) = parse_env_override(s)?;
        if k != BASE_URL_VAR {
            tracing::debug!(key = %k, "--env value is not used by any workflow");
        }
        map.insert(k, v);
    }
    Ok(map)
}

fn parse_env_override(s: &str) -> anyhow::Result<(String, String)> {
    let (k, v) = s
        .split_once('=')
        .with_context(|| format!("invalid --env (expected KEY=VALUE): {s}"))?;
    if k.is_empty() {
        anyhow::bail!("invalid --env (empty KEY): {s}");
    }
    Ok((k.to_string(), v.to_string()))
}
