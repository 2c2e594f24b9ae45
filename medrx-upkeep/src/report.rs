//! Per-cycle execution report.

use crate::cursor::CursorState;
use crate::error::{MaintenanceError, MaintenanceResult};
use medrx_store::StoreError;
use medrx_types::{Domain, PrescriptionId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An identifier tagged with its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "domain", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
    /// A user.
    User(UserId),
    /// A prescription.
    Prescription(PrescriptionId),
}

impl EntityRef {
    /// The identifier's domain.
    #[must_use]
    pub fn domain(&self) -> Domain {
        match self {
            Self::User(_) => Domain::Users,
            Self::Prescription(_) => Domain::Prescriptions,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::Prescription(id) => write!(f, "prescription {id}"),
        }
    }
}

/// Why an identifier was not mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The store does not know the identifier.
    NotFound,
    /// The entity is not in a state the mutation accepts.
    InvalidState,
    /// The entity no longer satisfies its staleness rule.
    NotEligible,
    /// The store failed for another reason.
    Store,
}

impl From<&StoreError> for FailureKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::InvalidState(_) => Self::InvalidState,
            _ => Self::Store,
        }
    }
}

/// One identifier that failed during execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    /// The identifier.
    pub target: EntityRef,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub detail: String,
}

/// Outcome of one execute phase.
///
/// Partial failure is not an error: every identifier is attempted and the
/// cursors still advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    succeeded: Vec<EntityRef>,
    failed: Vec<FailedEntry>,
    /// User cursor after the cycle.
    pub user_cursor: CursorState,
    /// Prescription cursor after the cycle.
    pub prescription_cursor: CursorState,
}

impl CycleReport {
    pub(crate) fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            user_cursor: CursorState::default(),
            prescription_cursor: CursorState::default(),
        }
    }

    pub(crate) fn record_success(&mut self, target: EntityRef) {
        self.succeeded.push(target);
    }

    pub(crate) fn record_failure(&mut self, target: EntityRef, kind: FailureKind, detail: String) {
        self.failed.push(FailedEntry {
            target,
            kind,
            detail,
        });
    }

    /// Identifiers mutated successfully, in processing order.
    #[must_use]
    pub fn succeeded(&self) -> &[EntityRef] {
        &self.succeeded
    }

    /// Identifiers that failed, in processing order.
    #[must_use]
    pub fn failed(&self) -> &[FailedEntry] {
        &self.failed
    }

    /// Returns true if `target` was mutated successfully.
    #[must_use]
    pub fn is_success(&self, target: &EntityRef) -> bool {
        self.succeeded.contains(target)
    }

    /// Returns the failure recorded for `target`, if any.
    #[must_use]
    pub fn failure_for(&self, target: &EntityRef) -> Option<&FailedEntry> {
        self.failed.iter().find(|f| &f.target == target)
    }

    /// Number of successful identifiers.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of failed identifiers.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Converts a report with failures into `PartialApplyFailure`.
    pub fn into_result(self) -> MaintenanceResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(MaintenanceError::PartialApplyFailure {
                failed: self.failure_count(),
            })
        }
    }
}
