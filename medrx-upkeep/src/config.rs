//! Scheduler configuration.

use crate::cursor::{validate_batch_size, DEFAULT_BATCH_SIZE};
use crate::error::{MaintenanceError, MaintenanceResult};
use crate::scanner::DEFAULT_INACTIVITY_PERIOD_DAYS;
use chrono::Duration;
use medrx_types::{Domain, Principal};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration for the maintenance scheduler.
///
/// Every field has a default so a partial JSON document is accepted;
/// [`validate`](Self::validate) rejects the values that would make a cycle
/// meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Users examined per cycle.
    pub user_batch_size: usize,
    /// Prescriptions examined per cycle.
    pub prescription_batch_size: usize,
    /// Age after which an unused account is stale (seconds).
    pub user_inactivity_period_secs: u64,
    /// Principal allowed to change configuration.
    pub administrator: Principal,
    /// Principal allowed to run the execute phase.
    pub executor_identity: Option<Principal>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            user_batch_size: DEFAULT_BATCH_SIZE,
            prescription_batch_size: DEFAULT_BATCH_SIZE,
            user_inactivity_period_secs: DEFAULT_INACTIVITY_PERIOD_DAYS as u64 * SECS_PER_DAY,
            administrator: Principal::nil(),
            executor_identity: None,
        }
    }
}

impl MaintenanceConfig {
    /// Creates a default configuration administered by `administrator`.
    #[must_use]
    pub fn new(administrator: Principal) -> Self {
        Self {
            administrator,
            ..Default::default()
        }
    }

    /// Sets the designated executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Principal) -> Self {
        self.executor_identity = Some(executor);
        self
    }

    /// Sets both batch sizes.
    #[must_use]
    pub fn with_batch_sizes(mut self, users: usize, prescriptions: usize) -> Self {
        self.user_batch_size = users;
        self.prescription_batch_size = prescriptions;
        self
    }

    /// Sets the inactivity period.
    #[must_use]
    pub fn with_inactivity_period(mut self, period: std::time::Duration) -> Self {
        self.user_inactivity_period_secs = period.as_secs();
        self
    }

    /// Loads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: &Path) -> MaintenanceResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MaintenanceError::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            MaintenanceError::InvalidConfiguration(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The batch size configured for a domain.
    #[must_use]
    pub fn batch_size(&self, domain: Domain) -> usize {
        match domain {
            Domain::Users => self.user_batch_size,
            Domain::Prescriptions => self.prescription_batch_size,
        }
    }

    /// The inactivity period as a signed duration.
    pub fn inactivity_period(&self) -> MaintenanceResult<Duration> {
        inactivity_period_from_secs(self.user_inactivity_period_secs)
    }

    /// Rejects out-of-range batch sizes, a zero inactivity period and empty
    /// principals.
    pub fn validate(&self) -> MaintenanceResult<()> {
        for domain in Domain::ALL {
            validate_batch_size(self.batch_size(domain)).map_err(|e| match e {
                MaintenanceError::InvalidConfiguration(msg) => {
                    MaintenanceError::InvalidConfiguration(format!("{domain} {msg}"))
                }
                other => other,
            })?;
        }
        self.inactivity_period()?;
        if self.administrator.is_nil() {
            return Err(MaintenanceError::InvalidConfiguration(
                "administrator must not be empty".to_string(),
            ));
        }
        if self.executor_identity.is_some_and(|p| p.is_nil()) {
            return Err(MaintenanceError::InvalidConfiguration(
                "executor must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Converts a period in seconds, rejecting zero and out-of-range values.
pub fn inactivity_period_from_secs(secs: u64) -> MaintenanceResult<Duration> {
    if secs == 0 {
        return Err(MaintenanceError::InvalidConfiguration(
            "inactivity period must be positive".to_string(),
        ));
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| {
            MaintenanceError::InvalidConfiguration(format!(
                "inactivity period out of range: {secs}s"
            ))
        })
}
