use anyhow::{Context, Result};
use clap::Parser;
use exam_core::MonitorConfig;
use exam_proctor::{Scenario, ScenarioRunner};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replays a scripted exam-page event stream through the integrity monitor
/// and prints what it would have done.
#[derive(Parser, Debug)]
#[command(name = "proctor-replay", version)]
struct Args {
    /// Scenario file (JSON).
    scenario: PathBuf,

    /// Monitor config (JSON) overriding the scenario's own `config`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Print the Prometheus exposition instead of the JSON report.
    #[arg(long)]
    metrics: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let raw = fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario {}", args.scenario.display()))?;
    let mut scenario = Scenario::from_json_str(&raw)
        .with_context(|| format!("parsing scenario {}", args.scenario.display()))?;

    if let Some(path) = &args.config {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        scenario.config = MonitorConfig::from_json_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
    }

    let report = ScenarioRunner::run(&scenario).context("replaying scenario")?;
    info!(
        steps = scenario.steps.len(),
        violations = report.violations.len(),
        submits = report.submits,
        "replay finished"
    );

    if args.metrics {
        print!("{}", report.metrics);
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
