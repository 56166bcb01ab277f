//! Monitoring API conformance check
//!
//! Authenticates against the identity service, runs the built-in scenario
//! suite against the monitoring API and prints `pass` when every scenario
//! passes. With `--json` the report goes to stdout and `pass` to stderr, so
//! the report stays machine-readable.
//!
//! Usage:
//!   monasca_conformance config.yaml
//!   monasca_conformance config.yaml --scenario notification-crud --scenario metric-post
//!   monasca_conformance config.yaml --continue-on-error --json
//!   monasca_conformance --list
//!
//! Exit codes: 0 pass, 1 scenario failure, 2 setup or configuration error.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::error;

use monasca_conformance::orchestrator::{self, ScenarioStatus};
use monasca_conformance::{
    catalog, identity, HarnessConfig, HttpConnection, Orchestrator, RunPolicy, RunReport,
    SchemaRegistry,
};

/// Structural conformance check for the monitoring REST API
#[derive(Parser, Debug)]
#[command(name = "monasca_conformance")]
#[command(about = "Run the monitoring API conformance suite")]
struct Args {
    /// YAML config naming the API URL and identity service
    #[arg(required_unless_present = "list")]
    config: Option<PathBuf>,

    /// Run only this scenario (can be specified multiple times)
    #[arg(long, short = 's')]
    scenario: Vec<String>,

    /// List scenarios in execution order and exit
    #[arg(long)]
    list: bool,

    /// Continue on error (don't stop on first failure)
    #[arg(long, short = 'c')]
    continue_on_error: bool,

    /// Output the run report as JSON
    #[arg(long)]
    json: bool,

    /// Log scenario progress
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if args.list {
        for scenario in catalog::default_suite() {
            println!("{:<30} {}", scenario.name().yellow(), scenario.description());
        }
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(report) => {
            if let Err(e) = emit(&report, args.json, &mut io::stdout(), &mut io::stderr()) {
                eprintln!("{} {e:#}", "ERROR:".red().bold());
                return ExitCode::from(2);
            }
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!(error = %e, "Run aborted");
            eprintln!("{} {e:#}", "ERROR:".red().bold());
            ExitCode::from(2)
        }
    }
}

async fn run(args: &Args) -> Result<RunReport> {
    let path = args
        .config
        .as_ref()
        .context("a config path is required")?;
    let config = HarnessConfig::load(path)
        .with_context(|| format!("loading config from {}", path.display()))?;

    let registry = SchemaRegistry::builtin().context("building schema registry")?;
    let scenarios = orchestrator::select(catalog::default_suite(), &args.scenario)?;

    let timeout = config.request_timeout_secs.map(Duration::from_secs);
    let provider = identity::provider_for(&config.keystone, timeout)?;
    let connection = HttpConnection::connect(&config, provider.as_ref())
        .await
        .context("connecting to the monitoring API")?;

    let policy = if args.continue_on_error {
        RunPolicy::ContinueOnError
    } else {
        RunPolicy::FailFast
    };
    let report = Orchestrator::new(&connection, &registry)
        .with_policy(policy)
        .run(&scenarios)
        .await?;
    Ok(report)
}

/// Write the report: JSON on `out` (with the verdict on `err`), or the
/// human summary on `out`.
fn emit(report: &RunReport, json: bool, out: &mut impl Write, err: &mut impl Write) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(report).context("serializing run report")?;
        writeln!(out, "{rendered}")?;
        if report.passed() {
            writeln!(err, "pass")?;
        }
        return Ok(());
    }
    write_summary(report, out)?;
    Ok(())
}

fn write_summary(report: &RunReport, out: &mut impl Write) -> io::Result<()> {
    for outcome in &report.outcomes {
        let status = match outcome.status {
            ScenarioStatus::Passed => "OK".green(),
            ScenarioStatus::Failed => "FAIL".red(),
            ScenarioStatus::Skipped => "SKIP".yellow(),
        };
        writeln!(
            out,
            "{:<30} {:<4} {}",
            outcome.name,
            status,
            format!("{} steps, {}ms", outcome.steps_run, outcome.duration_ms).dimmed()
        )?;
        if let Some(failure) = &outcome.failure {
            for line in failure.lines() {
                writeln!(out, "  {}", line.red())?;
            }
        }
    }

    if report.passed() {
        return writeln!(out, "pass");
    }

    writeln!(out, "\n{}", "═".repeat(60))?;
    writeln!(out, "API version:  {}", report.api_version.yellow().bold())?;
    writeln!(
        out,
        "Passed:       {}",
        report.count(ScenarioStatus::Passed).to_string().green()
    )?;
    writeln!(
        out,
        "Failed:       {}",
        report.count(ScenarioStatus::Failed).to_string().red()
    )?;
    let skipped = report.count(ScenarioStatus::Skipped);
    if skipped > 0 {
        writeln!(out, "Skipped:      {}", skipped.to_string().yellow())?;
    }
    Ok(())
}
