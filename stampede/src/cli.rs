use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 1s, 250ms, 2m)".to_string());
    }

    // Bare numbers are seconds.
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(s)
        .map_err(|e| format!("invalid duration '{s}': {e} (expected e.g. 1s, 250ms, 2m)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bar on stderr and a text report on stdout.
    HumanReadable,
    /// One JSON report document on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "stampede",
    version,
    about = "Staged HTTP load generator with weighted workflows and thresholds",
    long_about = "stampede ramps virtual users up and down over timed stages, dispatches each iteration to a weighted workflow, and checks the collected metrics against thresholds when the run ends.\n\nA run plan is a YAML file listing stages, scenarios (built-in workflows with weights) and thresholds.",
    after_help = "Examples:\n  stampede run plans/load-test-runner.yaml\n  stampede run plans/catalog-service.yaml --base-url http://localhost:8080\n  stampede run plans/cart-service.yaml --env BASE_URL=http://cart:8080 --output json\n  stampede list-workflows"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test plan
    #[command(
        long_about = "Run a YAML plan to completion (or until Ctrl-C) and print the report.\n\nThe target is chosen from --base-url, then --env BASE_URL, then the BASE_URL environment variable, then the plan's baseUrl, then http://localhost:8080."
    )]
    Run(RunArgs),

    /// List the built-in workflows a plan can reference
    ListWorkflows,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the run plan (.yaml)
    pub plan: PathBuf,

    /// Target base URL (overrides BASE_URL and the plan)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Add/override environment values (repeatable, KEY=VALUE). Only BASE_URL is consumed.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Seed for scenario selection, think times and workflow randomness
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reconciliation interval (e.g. 1s, 250ms)
    #[arg(long, value_parser = parse_duration)]
    pub tick: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(60 * 60)));
        assert_eq!(parse_duration("3"), Ok(Duration::from_secs(3)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn cli_parses_run_with_overrides() {
        let parsed = Cli::try_parse_from([
            "stampede",
            "run",
            "plan.yaml",
            "--base-url",
            "http://127.0.0.1:9000",
            "--env",
            "BASE_URL=http://other",
            "--env",
            "EMPTY=",
            "--output",
            "json",
            "--seed",
            "7",
            "--tick",
            "250ms",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.plan, PathBuf::from("plan.yaml"));
                assert_eq!(args.base_url.as_deref(), Some("http://127.0.0.1:9000"));
                assert_eq!(
                    args.env,
                    vec!["BASE_URL=http://other".to_string(), "EMPTY=".to_string()]
                );
                assert_eq!(args.output, OutputFormat::Json);
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.tick, Some(Duration::from_millis(250)));
            }
            Command::ListWorkflows => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_run_defaults() {
        let cli = Cli::try_parse_from(["stampede", "run", "plan.yaml"])
            .unwrap_or_else(|e| panic!("failed to parse args: {e}"));
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.output, OutputFormat::HumanReadable);
        assert!(args.env.is_empty());
        assert_eq!(args.base_url, None);
        assert_eq!(args.tick, None);
    }

    #[test]
    fn cli_rejects_bad_tick() {
        assert!(Cli::try_parse_from(["stampede", "run", "plan.yaml", "--tick", "soon"]).is_err());
    }

    #[test]
    fn cli_parses_list_workflows() {
        let cli = Cli::try_parse_from(["stampede", "list-workflows"])
            .unwrap_or_else(|e| panic!("failed to parse args: {e}"));
        assert!(matches!(cli.command, Command::ListWorkflows));
    }
}
