use std::process::{Command, Output};

use anyhow::Context as _;
use serde_json::Value;
use stampede_testserver::{TestServer, TestServerConfig};

const MIXED_PLAN: &str = r#"
# unreachable unless BASE_URL/--base-url override it
baseUrl: http://127.0.0.1:9
stages:
  - { duration: 300ms, target: 3 }
  - { duration: 600ms, target: 3 }
  - { duration: 200ms, target: 0 }
tick: 50ms
thinkTime: { min: 10ms, max: 30ms }
seed: 7
scenarios:
  - { name: catalog, weight: 40, trend: overall_response_time, checkPrefix: catalog }
  - { name: cart, weight: 40, trend: overall_response_time, checkPrefix: cart }
  - { name: frontend, weight: 20, trend: overall_response_time, checkPrefix: frontend }
thresholds:
  http_req_duration: ["p(95)<500"]
  http_req_failed: ["rate<0.1"]
  overall_response_time: ["p(95)<400"]
  iterations: ["count>0"]
"#;

fn describe(out: &Output) -> String {
    format!(
        "exit code {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}

async fn run_plan(
    yaml: &'static str,
    extra_args: Vec<String>,
    base_url_env: Option<String>,
) -> anyhow::Result<Output> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let plan = dir.path().join("plan.yaml");
    std::fs::write(&plan, yaml).context("write plan")?;

    let exe = env!("CARGO_BIN_EXE_stampede");
    let out = tokio::task::spawn_blocking(move || {
        let mut cmd = Command::new(exe);
        cmd.arg("run").arg(&plan).args(&extra_args).env_remove("BASE_URL");
        if let Some(url) = base_url_env {
            cmd.env("BASE_URL", url);
        }
        cmd.output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run stampede binary")?;
    drop(dir);
    Ok(out)
}

fn json_report(out: &Output) -> anyhow::Result<Value> {
    serde_json::from_slice(&out.stdout).with_context(|| describe(out))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mixed_plan_passes_and_reports_json() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let out = run_plan(
        MIXED_PLAN,
        vec![
            "--output".into(),
            "json".into(),
            "--base-url".into(),
            server.base_url().to_string(),
        ],
        None,
    )
    .await?;

    anyhow::ensure!(out.status.code() == Some(0), "{}", describe(&out));
    let v = json_report(&out)?;

    anyhow::ensure!(v.get("passed").and_then(Value::as_bool) == Some(true), "{v}");
    let requests = v
        .pointer("/totals/requests_total")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    anyhow::ensure!(requests > 0, "{v}");
    anyhow::ensure!(
        v.pointer("/totals/failed_requests").and_then(Value::as_u64) == Some(0),
        "{v}"
    );
    anyhow::ensure!(
        v.pointer("/totals/peak_vus").and_then(Value::as_u64) == Some(3),
        "{v}"
    );
    anyhow::ensure!(
        v.pointer("/metrics/overall_response_time/count")
            .and_then(Value::as_u64)
            == Some(requests),
        "every request lands in the shared trend: {v}"
    );
    anyhow::ensure!(
        v.pointer("/thresholds/results")
            .and_then(Value::as_array)
            .map(Vec::len)
            == Some(4),
        "{v}"
    );
    anyhow::ensure!(server.stats().requests_total() == requests, "{v}");

    let check_names: Vec<&str> = v
        .get("checks")
        .and_then(Value::as_array)
        .map(|checks| {
            checks
                .iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    anyhow::ensure!(!check_names.is_empty(), "{v}");
    anyhow::ensure!(
        check_names.iter().all(|name| {
            ["catalog - ", "cart - ", "frontend - "]
                .iter()
                .any(|prefix| name.starts_with(prefix))
        }),
        "check names carry their service prefix: {check_names:?}"
    );
    anyhow::ensure!(
        check_names.contains(&"cart - get cart status is 200"),
        "{check_names:?}"
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn process_base_url_overrides_the_plan() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let out = run_plan(MIXED_PLAN, Vec::new(), Some(server.base_url().to_string())).await?;

    anyhow::ensure!(out.status.code() == Some(0), "{}", describe(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(
        stdout.contains(&format!("base_url: {}", server.base_url())),
        "{}",
        describe(&out)
    );
    anyhow::ensure!(stdout.contains("result: PASS"), "{}", describe(&out));
    anyhow::ensure!(server.stats().requests_total() > 0, "{}", describe(&out));

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn injected_failures_fail_the_error_rate_threshold() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerConfig::default().with_fail_every(2))
        .await
        .context("start test server")?;

    let out = run_plan(
        MIXED_PLAN,
        vec!["--output".into(), "json".into()],
        Some(server.base_url().to_string()),
    )
    .await?;

    anyhow::ensure!(out.status.code() == Some(11), "{}", describe(&out));
    let v = json_report(&out)?;
    let failed = v
        .pointer("/totals/failed_requests")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    anyhow::ensure!(failed > 0, "{v}");

    let rate_result = v
        .pointer("/thresholds/results")
        .and_then(Value::as_array)
        .and_then(|rs| {
            rs.iter()
                .find(|r| r.get("metric").and_then(Value::as_str) == Some("http_req_failed"))
        })
        .cloned()
        .context("http_req_failed threshold missing")?;
    anyhow::ensure!(
        rate_result.get("pass").and_then(Value::as_bool) == Some(false),
        "{rate_result}"
    );

    server.shutdown().await;
    Ok(())
}
