//! Notifications emitted by the scheduler.
//!
//! Each state change the scheduler performs appends one event to its log.
//! Consumers drain the log with `MaintenanceScheduler::drain_events`.

use crate::cursor::CursorState;
use medrx_types::{Domain, PrescriptionId, Principal, UserId};
use serde::{Deserialize, Serialize};

/// A state change performed by the maintenance scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MaintenanceEvent {
    /// A stale user was deactivated.
    UserDeactivated {
        /// The deactivated user.
        user: UserId,
    },

    /// An expired prescription was invalidated and left the active index.
    PrescriptionInvalidated {
        /// The invalidated prescription.
        prescription: PrescriptionId,
    },

    /// The designated executor changed.
    ExecutorChanged {
        /// Previous executor, if any.
        previous: Option<Principal>,
        /// New executor.
        current: Principal,
    },

    /// Administration moved to another principal.
    AdministrationTransferred {
        /// Previous administrator.
        previous: Principal,
        /// New administrator.
        current: Principal,
    },

    /// A domain's batch size changed.
    BatchSizeChanged {
        /// Affected domain.
        domain: Domain,
        /// New batch size.
        batch_size: usize,
    },

    /// The user inactivity period changed.
    InactivityPeriodChanged {
        /// New period in seconds.
        seconds: i64,
    },

    /// An execute phase finished and cursors advanced.
    CycleCompleted {
        /// Identifiers mutated successfully.
        succeeded: usize,
        /// Identifiers that failed.
        failed: usize,
        /// User cursor after advancing.
        user_cursor: CursorState,
        /// Prescription cursor after advancing.
        prescription_cursor: CursorState,
    },
}
