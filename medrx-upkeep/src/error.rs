//! Error types for the maintenance core.

use medrx_store::StoreError;
use medrx_types::{Domain, Principal};
use thiserror::Error;

/// Result type for maintenance operations.
pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// Errors that can occur in maintenance operations.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// A configuration value was rejected at the point it would be set.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The caller is not allowed to perform the operation.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// Who attempted the operation.
        caller: Principal,
        /// What was attempted.
        action: &'static str,
    },

    /// Execute was attempted with nothing to do.
    #[error("execution plan is empty")]
    EmptyPlan,

    /// An identifier was added to an index that already holds it.
    #[error("duplicate identifier in {domain} index: {id}")]
    DuplicateIdentifier {
        /// Index the identifier was added to.
        domain: Domain,
        /// The offending identifier.
        id: String,
    },

    /// An identifier was expected in an index or store but is absent.
    #[error("identifier not found in {domain}: {id}")]
    NotFound {
        /// Domain that was searched.
        domain: Domain,
        /// The missing identifier.
        id: String,
    },

    /// The active index names an entity the store does not know.
    #[error("{domain} index references {id}, which is missing from the store")]
    IndexMismatch {
        /// Domain whose index is inconsistent.
        domain: Domain,
        /// The dangling identifier.
        id: String,
    },

    /// One or more identifiers failed their mutation.
    #[error("{failed} identifier(s) failed to apply")]
    PartialApplyFailure {
        /// Number of failed identifiers.
        failed: usize,
    },

    /// Another execute call is already applying a plan.
    #[error("a maintenance cycle is already executing")]
    CycleInProgress,

    /// Encoded plan bytes could not be decoded.
    #[error("plan decode error: {0}")]
    PlanDecode(#[from] crate::plan::PlanCodecError),

    /// A store call outside the per-identifier path failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal state lock was poisoned.
    #[error("scheduler state lock poisoned")]
    LockPoisoned,
}

impl MaintenanceError {
    /// Returns true for errors that indicate a broken index invariant.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateIdentifier { .. } | Self::NotFound { .. } | Self::IndexMismatch { .. }
        )
    }
}
