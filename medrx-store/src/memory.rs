//! In-memory record store.

use crate::{PrescriptionStore, StoreError, StoreResult, UserStore};
use medrx_types::{PrescriptionId, PrescriptionRecord, PrescriptionStatus, UserId, UserRecord};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct Records {
    users: HashMap<UserId, UserRecord>,
    user_order: Vec<UserId>,
    prescriptions: HashMap<PrescriptionId, PrescriptionRecord>,
    prescription_order: Vec<PrescriptionId>,
}

/// Record store backed by in-process maps.
///
/// Insertion order is preserved so `list()` and `active_ids()` are
/// deterministic.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Records>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Records>> {
        self.records.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Records>> {
        self.records.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Registers a user.
    pub fn insert_user(&self, user: UserRecord) -> StoreResult<()> {
        let mut records = self.write()?;
        if records.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        debug!("Inserted user {}", user.id);
        records.user_order.push(user.id);
        records.users.insert(user.id, user);
        Ok(())
    }

    /// Issues a prescription.
    pub fn insert_prescription(&self, prescription: PrescriptionRecord) -> StoreResult<()> {
        let mut records = self.write()?;
        if records.prescriptions.contains_key(&prescription.id) {
            return Err(StoreError::Duplicate(format!("prescription {}", prescription.id)));
        }
        debug!("Inserted prescription {}", prescription.id);
        records.prescription_order.push(prescription.id);
        records.prescriptions.insert(prescription.id, prescription);
        Ok(())
    }

    /// Links one more record to a user and returns the new count.
    pub fn add_associated_record(&self, id: &UserId) -> StoreResult<u32> {
        let mut records = self.write()?;
        let user = records
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.associated_record_count = user.associated_record_count.saturating_add(1);
        Ok(user.associated_record_count)
    }

    /// Marks a valid prescription as redeemed.
    pub fn mark_dispensed(&self, id: &PrescriptionId) -> StoreResult<()> {
        self.transition(id, PrescriptionStatus::Dispensed)
    }

    /// Returns a copy of the user record.
    pub fn user(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    /// Returns a copy of the prescription record.
    pub fn prescription(&self, id: &PrescriptionId) -> StoreResult<Option<PrescriptionRecord>> {
        Ok(self.read()?.prescriptions.get(id).cloned())
    }

    fn transition(&self, id: &PrescriptionId, to: PrescriptionStatus) -> StoreResult<()> {
        let mut records = self.write()?;
        let rx = records
            .prescriptions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("prescription {id}")))?;
        if rx.status != PrescriptionStatus::Valid {
            return Err(StoreError::InvalidState(format!(
                "prescription {id} is {}",
                rx.status
            )));
        }
        rx.status = to;
        debug!("Prescription {} -> {}", id, to);
        Ok(())
    }
}

impl UserStore for MemoryRecordStore {
    fn get(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        self.user(id)
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.read()?.user_order.len())
    }

    fn list(&self) -> StoreResult<Vec<UserId>> {
        Ok(self.read()?.user_order.clone())
    }

    fn deactivate(&self, id: &UserId) -> StoreResult<()> {
        let mut records = self.write()?;
        let user = records
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        if !user.active {
            return Err(StoreError::InvalidState(format!("user {id} is already inactive")));
        }
        user.active = false;
        debug!("Deactivated user {}", id);
        Ok(())
    }
}

impl PrescriptionStore for MemoryRecordStore {
    fn active_ids(&self) -> StoreResult<Vec<PrescriptionId>> {
        let records = self.read()?;
        Ok(records
            .prescription_order
            .iter()
            .filter(|id| {
                records
                    .prescriptions
                    .get(id)
                    .is_some_and(|rx| rx.status == PrescriptionStatus::Valid)
            })
            .copied()
            .collect())
    }

    fn get(&self, id: &PrescriptionId) -> StoreResult<Option<PrescriptionRecord>> {
        self.prescription(id)
    }

    fn invalidate(&self, id: &PrescriptionId) -> StoreResult<()> {
        self.transition(id, PrescriptionStatus::Invalidated)
    }
}
