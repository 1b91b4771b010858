use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sitewatch::alert::AlertState;
use sitewatch::config::Settings;
use sitewatch::data::duration::parse_duration;
use sitewatch::data::History;
use sitewatch::monitor::{Pipeline, FUNCTIONS_FILE, HISTORY_FILE};
use sitewatch::output;
use sitewatch::watch::watch;
use sitewatch_adapters::health::FunctionProbe;
use sitewatch_adapters::lighthouse::LighthouseRunner;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sitewatch", version)]
#[command(about = "Lighthouse, Core Web Vitals and function health monitoring")]
struct Args {
    /// Path to the config file (default: sitewatch.toml, optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding history and alert state
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run Lighthouse on every page and evaluate scores and vitals
    Check,
    /// Probe every function endpoint
    Health,
    /// Repeat `check` on an interval until interrupted
    Watch {
        /// Interval between checks (e.g., "15m", "1h")
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Analyze the stored history and write trends.json
    Report,
    /// Show open alerts and active cooldowns
    Status,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings = Settings::load(args.config.as_deref());
    if let Some(dir) = args.state_dir {
        settings.state_dir = dir;
    }

    let rt = tokio::runtime::Runtime::new()?;

    match args.command {
        Command::Check => rt.block_on(run_check(&settings)),
        Command::Health => rt.block_on(run_health(&settings)),
        Command::Watch { interval } => rt.block_on(run_watch(&settings, interval.as_deref())),
        Command::Report => run_report(&settings),
        Command::Status => run_status(&settings),
    }
}

fn lighthouse(settings: &Settings) -> LighthouseRunner {
    let mut builder = LighthouseRunner::builder()
        .program(&settings.audit.program)
        .timeout(settings.audit_timeout());
    if let Some(args) = &settings.audit.args {
        builder = builder.args(args.iter().cloned());
    }
    builder.build()
}

async fn run_check(settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::from_settings(settings);
    let report = pipeline
        .run_check(&lighthouse(settings), &settings.audit.pages, Utc::now())
        .await?;
    print!("{}", output::render_check(&report, pipeline.thresholds()));
    Ok(())
}

async fn run_health(settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::from_settings(settings);
    let probe = FunctionProbe::new(settings.probe_timeout());
    let report = pipeline
        .run_health(&probe, &settings.functions, Utc::now())
        .await?;
    print!("{}", output::render_health(&report, pipeline.thresholds()));
    Ok(())
}

async fn run_watch(settings: &Settings, interval: Option<&str>) -> Result<()> {
    let period = match interval {
        Some(s) => parse_duration(s)?,
        None => settings.watch_interval(),
    };

    let pipeline = Arc::new(Pipeline::from_settings(settings));
    let shown = Arc::clone(&pipeline);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    watch(
        pipeline,
        Arc::new(lighthouse(settings)),
        Arc::new(settings.audit.pages.clone()),
        period,
        shutdown,
        |result| match result {
            Ok(report) => print!("{}", output::render_check(&report, shown.thresholds())),
            Err(e) => warn!("Check failed: {:#}", e),
        },
    )
    .await
}

fn run_report(settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::new(
        &settings.state_dir,
        settings.retention,
        settings.thresholds(),
        Default::default(),
    );
    let snapshot = pipeline.report(Utc::now())?;
    let pages = History::load(&settings.state_dir.join(HISTORY_FILE));
    let functions = History::load(&settings.state_dir.join(FUNCTIONS_FILE));
    print!(
        "{}",
        output::render_report(&snapshot, &pages, &functions, pipeline.thresholds())
    );
    Ok(())
}

fn run_status(settings: &Settings) -> Result<()> {
    let now = Utc::now();
    let state = AlertState::load(&settings.state_dir, now);
    print!("{}", output::render_status(&state, now));
    Ok(())
}
