//! medrx maintenance keeper
//!
//! Drives the two-phase staleness maintenance against a SQLite record store:
//! 1. Check one cursor window per domain for stale users and expired prescriptions
//! 2. Execute the resulting plan as the configured executor
//!
//! Usage:
//!   medrx-keeper --db medrx.db --config keeper.json check
//!   medrx-keeper --db medrx.db --config keeper.json --state cursors.json run --interval-secs 600

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use medrx_keeper::{Keeper, TickOutcome};
use medrx_store::SqliteRecordStore;
use medrx_types::Principal;
use medrx_upkeep::{MaintenanceConfig, MaintenanceScheduler, SystemClock};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "medrx-keeper")]
#[command(about = "Staleness maintenance for medrx users and prescriptions")]
struct Args {
    /// Path to the SQLite record store
    #[arg(long, default_value = "medrx.db")]
    db: PathBuf,

    /// Path to the JSON maintenance configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Path to the cursor state file
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plan for the current windows without executing it
    Check,
    /// Run a single check/execute tick
    Once,
    /// Tick periodically until interrupted
    Run {
        /// Seconds between ticks
        #[arg(long, default_value = "3600")]
        interval_secs: u64,

        /// Stop after this many ticks
        #[arg(long)]
        max_cycles: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = MaintenanceConfig::from_json_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    let executor = config.executor_identity;

    let store = Arc::new(
        SqliteRecordStore::open(&args.db)
            .with_context(|| format!("Failed to open store {}", args.db.display()))?,
    );
    let scheduler = Arc::new(MaintenanceScheduler::new(
        config,
        store.clone(),
        store,
        Arc::new(SystemClock),
    )?);

    match args.command {
        Command::Check => {
            let outcome = scheduler.check_cycle()?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Once => {
            let keeper = build_keeper(scheduler, executor, args.state).await?;
            match keeper.tick().await? {
                TickOutcome::Idle => info!("Nothing stale"),
                TickOutcome::Executed(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
        Command::Run {
            interval_secs,
            max_cycles,
        } => {
            let keeper = build_keeper(scheduler, executor, args.state).await?;
            let interval = Duration::from_secs(interval_secs.max(1));
            tokio::select! {
                summary = keeper.run(interval, max_cycles) => {
                    let summary = summary?;
                    info!(
                        "Stopped after {} ticks: {} executed, {} succeeded, {} failed, {} errors",
                        summary.ticks, summary.executed, summary.succeeded, summary.failed, summary.errors
                    );
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down");
                }
            }
        }
    }
    Ok(())
}

async fn build_keeper(
    scheduler: Arc<MaintenanceScheduler>,
    executor: Option<Principal>,
    state: Option<PathBuf>,
) -> Result<Keeper> {
    let Some(executor) = executor else {
        bail!("config has no executor_identity; cannot execute");
    };
    let mut keeper = Keeper::new(scheduler, executor);
    if let Some(state) = state {
        keeper = keeper.with_state_path(state);
    }
    if keeper.restore_state().await? {
        info!("Resuming from saved cursor state");
    }
    Ok(keeper)
}
