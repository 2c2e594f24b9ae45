//! Periodic driver for the maintenance scheduler.
//!
//! The keeper plays the external trigger: on every tick it reconciles the
//! active indexes with the stores, runs a check and, when the check finds
//! work, hands the encoded plan to the execute phase as the designated
//! executor.
//! Cursor positions are written to a JSON state file after each executed
//! cycle so a restarted keeper resumes where the previous one stopped.

use anyhow::{Context, Result};
use medrx_types::Principal;
use medrx_upkeep::{CursorSnapshot, CycleReport, MaintenanceResult, MaintenanceScheduler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The check found nothing stale.
    Idle,
    /// A plan was executed.
    Executed(CycleReport),
}

/// Totals over a [`Keeper::run`] loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub executed: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: u64,
}

/// Drives a scheduler as its designated executor.
pub struct Keeper {
    scheduler: Arc<MaintenanceScheduler>,
    executor: Principal,
    state_path: Option<PathBuf>,
}

impl Keeper {
    /// Creates a keeper that executes as `executor`.
    pub fn new(scheduler: Arc<MaintenanceScheduler>, executor: Principal) -> Self {
        Self {
            scheduler,
            executor,
            state_path: None,
        }
    }

    /// Persists cursor positions to `path` after every executed cycle.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    pub fn scheduler(&self) -> &Arc<MaintenanceScheduler> {
        &self.scheduler
    }

    /// Loads persisted cursors into the scheduler.
    ///
    /// Returns false when no state path is configured or the file does not
    /// exist yet.
    pub async fn restore_state(&self) -> Result<bool> {
        let Some(path) = &self.state_path else {
            return Ok(false);
        };
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("No cursor state at {:?}", path);
            return Ok(false);
        }
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read cursor state {}", path.display()))?;
        let snapshot: CursorSnapshot =
            serde_json::from_slice(&raw).context("Failed to decode cursor state")?;
        self.scheduler.restore_cursors(snapshot)?;
        info!(
            "Restored cursors: users at {}, prescriptions at {}",
            snapshot.users.position, snapshot.prescriptions.position
        );
        Ok(true)
    }

    /// Refreshes the indexes, runs one check and, if anything is stale, one
    /// execute.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let scheduler = self.scheduler.clone();
        let executor = self.executor;
        let outcome = tokio::task::spawn_blocking(move || -> MaintenanceResult<TickOutcome> {
            let refreshed = scheduler.refresh_indexes()?;
            if refreshed > 0 {
                debug!("Indexes picked up {} store changes", refreshed);
            }
            let check = scheduler.check_cycle()?;
            if !check.needed {
                return Ok(TickOutcome::Idle);
            }
            let report = scheduler.execute_encoded(executor, &check.encode())?;
            Ok(TickOutcome::Executed(report))
        })
        .await
        .context("Maintenance task panicked")??;

        for event in self.scheduler.drain_events() {
            debug!("event: {}", serde_json::to_string(&event)?);
        }

        if let TickOutcome::Executed(report) = &outcome {
            info!(
                "Cycle executed: {} succeeded, {} failed",
                report.success_count(),
                report.failure_count()
            );
            self.save_state().await?;
        }
        Ok(outcome)
    }

    /// Ticks every `interval` until `max_cycles` ticks have run, or forever.
    ///
    /// A failed tick is logged and counted; the loop keeps going.
    pub async fn run(&self, interval: Duration, max_cycles: Option<u64>) -> Result<RunSummary> {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = RunSummary::default();

        info!("Keeper running every {:?}", interval);
        while max_cycles.is_none_or(|max| summary.ticks < max) {
            timer.tick().await;
            summary.ticks += 1;
            match self.tick().await {
                Ok(TickOutcome::Idle) => debug!("Tick {}: nothing stale", summary.ticks),
                Ok(TickOutcome::Executed(report)) => {
                    summary.executed += 1;
                    summary.succeeded += report.success_count();
                    summary.failed += report.failure_count();
                }
                Err(e) => {
                    summary.errors += 1;
                    error!("Tick {} failed: {:#}", summary.ticks, e);
                }
            }
        }
        Ok(summary)
    }

    async fn save_state(&self) -> Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let snapshot = self.scheduler.cursor_state()?;
        write_state(path, &snapshot).await
    }
}

/// Writes the snapshot next to `path` and renames it into place.
async fn write_state(path: &Path, snapshot: &CursorSnapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Saved cursor state to {:?}", path);
    Ok(())
}
