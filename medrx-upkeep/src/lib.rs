//! Staleness-driven batch maintenance for medrx.
//!
//! Sweeps two record families under a fixed per-cycle work budget:
//! - users that registered long ago, never linked a record and are still active
//! - prescriptions still marked valid after their due date
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Registry**: removable active-entity index with O(1) swap-and-shrink removal
//! - **Cursor**: resumable per-domain scan position yielding bounded windows
//! - **Scanner**: pure staleness predicates and a lazy windowed scan
//! - **Plan**: per-domain eligible identifiers and their length-prefixed encoding
//! - **Gate**: administrator and designated executor
//! - **Scheduler**: the two-phase check/execute protocol
//!
//! ## Cycle
//!
//! 1. **Check**: read one window per domain, collect eligible identifiers
//! 2. **Execute**: the designated executor applies the plan through the stores
//! 3. **Advance**: each cursor moves one batch modulo its post-mutation domain size
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use medrx_store::MemoryRecordStore;
//! use medrx_types::Principal;
//! use medrx_upkeep::{MaintenanceConfig, MaintenanceScheduler, SystemClock};
//!
//! let admin = Principal::new();
//! let store = Arc::new(MemoryRecordStore::new());
//! let scheduler = MaintenanceScheduler::new(
//!     MaintenanceConfig::new(admin),
//!     store.clone(),
//!     store,
//!     Arc::new(SystemClock),
//! )
//! .unwrap();
//!
//! let outcome = scheduler.check_cycle().unwrap();
//! assert!(!outcome.needed);
//! ```

mod clock;
mod config;
mod cursor;
mod error;
mod event;
mod gate;
pub mod plan;
pub mod registry;
mod report;
pub mod scanner;
mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{inactivity_period_from_secs, MaintenanceConfig};
pub use cursor::{BatchCursor, CursorState, ScanWindow, DEFAULT_BATCH_SIZE};
pub use error::{MaintenanceError, MaintenanceResult};
pub use event::MaintenanceEvent;
pub use gate::ExecutionGate;
pub use plan::{CheckOutcome, ExecutionPlan, PlanCodecError, MAX_PLAN_ENTRIES};
pub use registry::{ActiveIndexRegistry, RegistryError, RegistrySnapshot};
pub use report::{CycleReport, EntityRef, FailedEntry, FailureKind};
pub use scanner::{
    is_stale_prescription, is_stale_user, scan, PrescriptionExpiry, StalenessRule,
    UserInactivity, DEFAULT_INACTIVITY_PERIOD_DAYS,
};
pub use scheduler::{CursorSnapshot, MaintenanceScheduler, SchedulerPhase};
