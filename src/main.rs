#![forbid(unsafe_code)]

//! `task-reminder`: scheduled due-date reminder binary.
//!
//! Loads configuration, picks the delivery backend, and either runs the
//! reminder pipeline once or keeps it armed on a recurring schedule until
//! interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use task_reminder::config::{BackendKind, GlobalConfig};
use task_reminder::source::{JsonFileSource, TaskSource};
use task_reminder::{delivery, AppError, ReminderPipeline, Result, RunOutcome, RunScheduler};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "task-reminder", about = "Due-date reminders for a task list", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Use the simulated backend regardless of configuration.
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline once and exit.
    Run {
        /// Reference date (YYYY-MM-DD) to use instead of today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Stay resident and run on the configured schedule.
    Schedule {
        /// Cron expression overriding the configured schedule.
        #[arg(long)]
        cron: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("task-reminder bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.apply_env_overrides();
    if args.simulate {
        config.backend = BackendKind::Simulated;
    }
    config.validate_backend()?;
    config.load_credentials().await?;
    info!(backend = ?config.backend, tasks = %config.tasks_path.display(), "configuration loaded");

    // ── Assemble pipeline ───────────────────────────────
    let source: Arc<dyn TaskSource> = Arc::new(JsonFileSource::new(&config.tasks_path));
    let backend = delivery::from_config(&config)?;
    let pipeline = Arc::new(ReminderPipeline::new(source, backend));
    let scheduler = Arc::new(
        RunScheduler::new(pipeline)
            .with_daily_time(config.schedule.daily_hour, config.schedule.daily_minute)?,
    );

    match args.command {
        Command::Run { date } => run_now(&scheduler, date).await,
        Command::Schedule { cron } => {
            let cron = cron.or_else(|| config.schedule.cron.clone());
            run_scheduled(&scheduler, cron.as_deref()).await
        }
    }
}

async fn run_now(scheduler: &RunScheduler, date: Option<NaiveDate>) -> Result<()> {
    let outcome = match date {
        Some(date) => {
            info!(%date, "running with fixed reference date");
            scheduler.run_once_for(date).await
        }
        None => scheduler.run_once().await,
    };

    match outcome {
        Ok(RunOutcome::Completed(report)) => {
            info!(
                due = report.total_due_today,
                succeeded = report.success_count,
                failed = report.failure_count,
                "reminder run complete"
            );
            Ok(())
        }
        Ok(RunOutcome::Skipped) => {
            info!("another run was in progress; nothing done");
            Ok(())
        }
        Err(err) => {
            error!(%err, "reminder run failed");
            Err(err)
        }
    }
}

async fn run_scheduled(scheduler: &Arc<RunScheduler>, cron: Option<&str>) -> Result<()> {
    let ct = CancellationToken::new();
    let trigger = match cron {
        Some(expression) => scheduler.schedule_custom(expression, ct.clone())?,
        None => scheduler.schedule_daily(ct.clone()),
    };
    info!("scheduler running; press ctrl-c to stop");

    cancel_on_signal(ct).await;

    if let Err(err) = trigger.await {
        error!(%err, "reminder trigger task failed");
    }
    info!("task-reminder shut down");
    Ok(())
}

/// Cancel `ct` on ctrl-c, or on SIGTERM where the platform has it.
async fn cancel_on_signal(ct: CancellationToken) {
    let received = wait_for_signal().await;
    info!(signal = received, "stopping scheduler");
    ct.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        warn!("SIGTERM unavailable; stop with ctrl-c");
        return ctrl_c().await;
    };
    tokio::select! {
        name = ctrl_c() => name,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Keep running until killed.
        error!(%err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    "ctrl-c"
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let installed = match log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|err| AppError::Config(format!("cannot install log subscriber: {err}")))
}
