//! Authorization for the mutating entry point and administrative setters.

use crate::error::{MaintenanceError, MaintenanceResult};
use medrx_types::Principal;
use tracing::info;

/// Holds the administrator and the designated executor.
///
/// Only the executor may run the execute phase. Only the administrator may
/// change configuration, including who the executor is. The check phase is
/// never gated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionGate {
    administrator: Principal,
    executor: Option<Principal>,
}

impl ExecutionGate {
    /// Creates a gate with no executor configured.
    pub fn new(administrator: Principal) -> MaintenanceResult<Self> {
        if administrator.is_nil() {
            return Err(MaintenanceError::InvalidConfiguration(
                "administrator must not be empty".to_string(),
            ));
        }
        Ok(Self {
            administrator,
            executor: None,
        })
    }

    /// The administrator.
    #[must_use]
    pub fn administrator(&self) -> Principal {
        self.administrator
    }

    /// The designated executor, if one has been configured.
    #[must_use]
    pub fn executor(&self) -> Option<Principal> {
        self.executor
    }

    /// Fails with `Unauthorized` unless `caller` is the configured executor.
    pub fn authorize_execute(&self, caller: Principal) -> MaintenanceResult<()> {
        match self.executor {
            Some(executor) if executor == caller => Ok(()),
            _ => Err(MaintenanceError::Unauthorized {
                caller,
                action: "execute a maintenance cycle",
            }),
        }
    }

    /// Fails with `Unauthorized` unless `caller` is the administrator.
    pub fn authorize_admin(&self, caller: Principal) -> MaintenanceResult<()> {
        if caller == self.administrator {
            Ok(())
        } else {
            Err(MaintenanceError::Unauthorized {
                caller,
                action: "change maintenance configuration",
            })
        }
    }

    /// Designates a new executor.
    ///
    /// Returns `Ok(false)` without changing anything when `executor` is
    /// already designated.
    pub fn set_executor(&mut self, caller: Principal, executor: Principal) -> MaintenanceResult<bool> {
        self.authorize_admin(caller)?;
        if executor.is_nil() {
            return Err(MaintenanceError::InvalidConfiguration(
                "executor must not be empty".to_string(),
            ));
        }
        if self.executor == Some(executor) {
            return Ok(false);
        }
        info!("Executor changed to {}", executor);
        self.executor = Some(executor);
        Ok(true)
    }

    /// Hands administration to another principal.
    pub fn transfer_administration(
        &mut self,
        caller: Principal,
        administrator: Principal,
    ) -> MaintenanceResult<bool> {
        self.authorize_admin(caller)?;
        if administrator.is_nil() {
            return Err(MaintenanceError::InvalidConfiguration(
                "administrator must not be empty".to_string(),
            ));
        }
        if administrator == self.administrator {
            return Ok(false);
        }
        info!("Administration transferred to {}", administrator);
        self.administrator = administrator;
        Ok(true)
    }
}
