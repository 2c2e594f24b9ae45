//! User and prescription stores for medrx.
//!
//! The maintenance core never owns entity state. It consults and mutates
//! the record families through two narrow interfaces:
//!
//! - [`UserStore`]: registered users, their activity flag and linked record count
//! - [`PrescriptionStore`]: issued prescriptions, their status and due date
//!
//! Two implementations are provided:
//!
//! - [`MemoryRecordStore`]: in-process maps, for tests and embedding
//! - [`SqliteRecordStore`]: SQLite-backed, used by the keeper binary
//!
//! Both implement both traits, so one store instance can back both domains.

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use medrx_types::{PrescriptionId, PrescriptionRecord, UserId, UserRecord};

/// Read and deactivate access to registered users.
pub trait UserStore: Send + Sync {
    /// Returns the user, or `None` if the id was never registered.
    fn get(&self, id: &UserId) -> StoreResult<Option<UserRecord>>;

    /// Returns the number of registered users (active or not).
    fn count(&self) -> StoreResult<usize>;

    /// Returns every registered user id in registration order.
    fn list(&self) -> StoreResult<Vec<UserId>>;

    /// Marks an active user inactive.
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidState` if the user
    /// is already inactive.
    fn deactivate(&self, id: &UserId) -> StoreResult<()>;
}

/// Read and invalidate access to issued prescriptions.
pub trait PrescriptionStore: Send + Sync {
    /// Returns the ids of all `Valid` prescriptions in issue order.
    fn active_ids(&self) -> StoreResult<Vec<PrescriptionId>>;

    /// Returns the prescription, or `None` if the id was never issued.
    fn get(&self, id: &PrescriptionId) -> StoreResult<Option<PrescriptionRecord>>;

    /// Moves a `Valid` prescription to `Invalidated`.
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidState` if the
    /// prescription is not currently `Valid`.
    fn invalidate(&self, id: &PrescriptionId) -> StoreResult<()>;
}
