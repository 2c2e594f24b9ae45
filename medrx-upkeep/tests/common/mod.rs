//! Shared fixtures for scheduler tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use medrx_store::{MemoryRecordStore, PrescriptionStore, StoreError, StoreResult, UserStore};
use medrx_types::{PrescriptionId, PrescriptionRecord, Principal, UserId, UserRecord};
use medrx_upkeep::{FixedClock, MaintenanceConfig, MaintenanceScheduler};
use std::collections::HashSet;
use std::sync::{Arc, Barrier, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed reference instant for every scenario.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

/// A store, a frozen clock and the two principals.
pub struct Fixture {
    pub store: Arc<ScriptedStore>,
    pub clock: Arc<FixedClock>,
    pub admin: Principal,
    pub executor: Principal,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(ScriptedStore::default()),
            clock: Arc::new(FixedClock::new(epoch())),
            admin: Principal::new(),
            executor: Principal::new(),
        }
    }

    /// Default configuration with the executor designated.
    pub fn config(&self) -> MaintenanceConfig {
        MaintenanceConfig::new(self.admin).with_executor(self.executor)
    }

    pub fn scheduler(&self) -> MaintenanceScheduler {
        self.scheduler_with(self.config())
    }

    pub fn scheduler_with(&self, config: MaintenanceConfig) -> MaintenanceScheduler {
        MaintenanceScheduler::new(
            config,
            self.store.clone(),
            self.store.clone(),
            self.clock.clone(),
        )
        .unwrap()
    }

    /// Registers an unused active user `age_days` before the epoch.
    pub fn user(&self, age_days: i64) -> UserId {
        let id = UserId::new();
        self.store
            .inner
            .insert_user(UserRecord::new(id, epoch() - Duration::days(age_days)))
            .unwrap();
        id
    }

    /// Issues a valid prescription due `due_in_days` after the epoch.
    pub fn prescription(&self, due_in_days: i64) -> PrescriptionId {
        let id = PrescriptionId::new();
        let issued = epoch() - Duration::days(30);
        self.store
            .inner
            .insert_prescription(PrescriptionRecord::new(
                id,
                UserId::new(),
                issued,
                epoch() + Duration::days(due_in_days),
            ))
            .unwrap();
        id
    }

    pub fn user_record(&self, id: &UserId) -> UserRecord {
        self.store.inner.user(id).unwrap().unwrap()
    }

    pub fn prescription_record(&self, id: &PrescriptionId) -> PrescriptionRecord {
        self.store.inner.prescription(id).unwrap().unwrap()
    }
}

/// Memory store with injectable faults.
///
/// - `hide_*`: `get` reports the id as unknown while `list`/`active_ids` still return it
/// - `fail_deactivate`: `deactivate` fails with a store error for that user
/// - `block_next_deactivate`: the next `deactivate` waits on a barrier twice
#[derive(Default)]
pub struct ScriptedStore {
    pub inner: MemoryRecordStore,
    hidden_users: Mutex<HashSet<UserId>>,
    hidden_prescriptions: Mutex<HashSet<PrescriptionId>>,
    failing_users: Mutex<HashSet<UserId>>,
    gate: Mutex<Option<Arc<Barrier>>>,
    armed: AtomicBool,
}

impl ScriptedStore {
    pub fn hide_user(&self, id: UserId) {
        self.hidden_users.lock().unwrap().insert(id);
    }

    pub fn hide_prescription(&self, id: PrescriptionId) {
        self.hidden_prescriptions.lock().unwrap().insert(id);
    }

    pub fn fail_deactivate(&self, id: UserId) {
        self.failing_users.lock().unwrap().insert(id);
    }

    /// Blocks the next `deactivate` until two extra parties pass `barrier`:
    /// once when the call is entered, once to release it.
    pub fn block_next_deactivate(&self, barrier: Arc<Barrier>) {
        *self.gate.lock().unwrap() = Some(barrier);
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl UserStore for ScriptedStore {
    fn get(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        if self.hidden_users.lock().unwrap().contains(id) {
            return Ok(None);
        }
        self.inner.user(id)
    }

    fn count(&self) -> StoreResult<usize> {
        UserStore::count(&self.inner)
    }

    fn list(&self) -> StoreResult<Vec<UserId>> {
        self.inner.list()
    }

    fn deactivate(&self, id: &UserId) -> StoreResult<()> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let barrier = self.gate.lock().unwrap().clone();
            if let Some(barrier) = barrier {
                barrier.wait();
                barrier.wait();
            }
        }
        if self.failing_users.lock().unwrap().contains(id) {
            return Err(StoreError::InvalidData(format!("write rejected for {id}")));
        }
        self.inner.deactivate(id)
    }
}

impl PrescriptionStore for ScriptedStore {
    fn active_ids(&self) -> StoreResult<Vec<PrescriptionId>> {
        self.inner.active_ids()
    }

    fn get(&self, id: &PrescriptionId) -> StoreResult<Option<PrescriptionRecord>> {
        if self.hidden_prescriptions.lock().unwrap().contains(id) {
            return Ok(None);
        }
        self.inner.prescription(id)
    }

    fn invalidate(&self, id: &PrescriptionId) -> StoreResult<()> {
        self.inner.invalidate(id)
    }
}
