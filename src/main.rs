//! Sentiment Pulse - periodic sentiment pipeline with anomaly alerting
//!
//! # Usage
//!
//! ```bash
//! # Run the pipeline every 2 minutes until Ctrl+C / SIGTERM
//! sentiment-pulse run
//!
//! # One full pipeline pass
//! sentiment-pulse tick
//!
//! # Anomaly detection only, optionally forcing the alert
//! sentiment-pulse detect --force
//!
//! # Print the current alert flag
//! sentiment-pulse alert-status
//! ```
//!
//! # Environment Variables
//!
//! - `PULSE_CONFIG`: Path to the TOML config (default: ./pulse_config.toml)
//! - `PULSE_INTERVAL_SECS`: Override the pipeline interval
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sentiment_pulse::alert::AlertFlag;
use sentiment_pulse::anomaly::AnomalyEngine;
use sentiment_pulse::config::{self, PulseConfig};
use sentiment_pulse::scheduler::{spawn_signal_listener, PipelineRunner, Scheduler};
use sentiment_pulse::types::AlertState;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "sentiment-pulse")]
#[command(about = "Periodic sentiment pipeline with anomaly scoring and alerting")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides PULSE_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the pipeline on its schedule until interrupted (default)
    Run {
        /// Run one tick immediately instead of waiting one interval
        #[arg(long)]
        now: bool,
    },

    /// Run every stage once and exit
    Tick,

    /// Run only the anomaly detection pass
    Detect {
        /// Assert the alert flag regardless of the data
        #[arg(long, env = "PULSE_FORCE_ALERT")]
        force: bool,

        /// Emotion-labelled CSV to score instead of the configured path
        #[arg(long, value_name = "CSV")]
        input: Option<PathBuf>,
    },

    /// Print the current alert state and message
    AlertStatus,
}

// ============================================================================
// Startup
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn load_config(explicit: Option<&PathBuf>) -> Result<PulseConfig> {
    match explicit {
        Some(path) => PulseConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let config = PulseConfig::load();
            config.validate().context("Invalid configuration")?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.json_logs);

    config::init(load_config(args.config.as_ref())?);
    let cfg = config::get();

    match args.command.unwrap_or(SubCommand::Run { now: false }) {
        SubCommand::Run { now } => run_daemon(cfg, now).await,
        SubCommand::Tick => run_single_tick(cfg).await,
        SubCommand::Detect { force, input } => run_detect(cfg, force, input).await,
        SubCommand::AlertStatus => print_alert_status(cfg),
    }
}

// ============================================================================
// Subcommands
// ============================================================================

async fn run_daemon(cfg: &PulseConfig, now: bool) -> Result<()> {
    info!("🚀 Starting Sentiment Pulse pipeline scheduler");

    let runner = PipelineRunner::from_config(cfg).context("Failed to build pipeline")?;
    let mut scheduler_config = cfg.scheduler.clone();
    scheduler_config.run_on_start |= now;
    let scheduler =
        Scheduler::from_config(runner, &scheduler_config).context("Invalid scheduler cadence")?;

    let cancel_token = CancellationToken::new();
    let listener = spawn_signal_listener(cancel_token.clone());

    let ticks = scheduler.run(cancel_token.clone()).await;
    listener.abort();

    info!(ticks, "✓ Sentiment Pulse shutdown complete");
    Ok(())
}

async fn run_single_tick(cfg: &PulseConfig) -> Result<()> {
    let runner = PipelineRunner::from_config(cfg).context("Failed to build pipeline")?;

    let cancel_token = CancellationToken::new();
    let listener = spawn_signal_listener(cancel_token.clone());

    let report = runner.run_all_stages(&cancel_token).await;
    listener.abort();

    for result in &report.results {
        println!("{:<24} {}", result.stage, result.status);
    }
    for (stage, reason) in &report.skipped {
        println!("{:<24} SKIPPED: {}", stage, reason);
    }
    if report.failed() > 0 {
        warn!(failed = report.failed(), "Tick completed with failed stages");
    }
    Ok(())
}

async fn run_detect(cfg: &PulseConfig, force: bool, input: Option<PathBuf>) -> Result<()> {
    let mut paths = cfg.paths.clone();
    if let Some(input) = input {
        paths.emotion_results = input;
    }
    let engine = AnomalyEngine::from_config(&cfg.anomaly, &paths);
    let force = force || cfg.anomaly.force_alert;

    let summary = tokio::task::spawn_blocking(move || engine.run_pass(force))
        .await
        .context("Anomaly detection task failed")?
        .context("Anomaly detection pass failed")?;

    println!(
        "records={} anomalies={} serious={} alert={}",
        summary.records, summary.anomalies, summary.serious, summary.state
    );
    Ok(())
}

fn print_alert_status(cfg: &PulseConfig) -> Result<()> {
    let flag = AlertFlag::new(cfg.paths.alert_flag.clone());
    match flag.load().context("Failed to read alert flag")? {
        Some(payload) => {
            println!("{}", AlertState::Alert);
            println!("{}", payload.render());
        }
        None => println!("{}", AlertState::NoAlert),
    }
    Ok(())
}
