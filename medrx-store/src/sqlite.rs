//! SQLite-backed record store.
//!
//! Users and prescriptions live in one database file. Row order follows an
//! autoincrement sequence column so listings come back in registration order.
//! Timestamps are stored as milliseconds since the Unix epoch.

use crate::{PrescriptionStore, StoreError, StoreResult, UserStore};
use chrono::{DateTime, Utc};
use medrx_types::{PrescriptionId, PrescriptionRecord, PrescriptionStatus, UserId, UserRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Persistent record store backed by SQLite.
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore").finish_non_exhaustive()
    }
}

impl SqliteRecordStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                active INTEGER NOT NULL,
                record_count INTEGER NOT NULL,
                registered_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS prescriptions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                patient TEXT NOT NULL,
                status TEXT NOT NULL,
                issued_at INTEGER NOT NULL,
                due_date INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions(status);
            ",
        )?;
        Ok(())
    }

    // ── Population ───────────────────────────────────────────────

    /// Registers a user.
    pub fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT seq FROM users WHERE id = ?1",
                params![user.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        conn.execute(
            "INSERT INTO users (id, active, record_count, registered_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.active,
                user.associated_record_count,
                user.registered_at.timestamp_millis(),
            ],
        )?;
        debug!("Inserted user {}", user.id);
        Ok(())
    }

    /// Issues a prescription.
    pub fn insert_prescription(&self, rx: &PrescriptionRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT seq FROM prescriptions WHERE id = ?1",
                params![rx.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::Duplicate(format!("prescription {}", rx.id)));
        }
        conn.execute(
            "INSERT INTO prescriptions (id, patient, status, issued_at, due_date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                rx.id.to_string(),
                rx.patient.to_string(),
                rx.status.to_string(),
                rx.issued_at.timestamp_millis(),
                rx.due_date.timestamp_millis(),
            ],
        )?;
        debug!("Inserted prescription {}", rx.id);
        Ok(())
    }

    /// Links one more record to a user and returns the new count.
    pub fn add_associated_record(&self, id: &UserId) -> StoreResult<u32> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE users SET record_count = record_count + 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        let count: u32 = conn.query_row(
            "SELECT record_count FROM users WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Marks a valid prescription as redeemed.
    pub fn mark_dispensed(&self, id: &PrescriptionId) -> StoreResult<()> {
        self.transition(id, PrescriptionStatus::Dispensed)
    }

    // ── Lookups ──────────────────────────────────────────────────

    /// Loads a user record.
    pub fn user(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT active, record_count, registered_at FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let active: bool = row.get(0)?;
                    let count: u32 = row.get(1)?;
                    let registered_at: i64 = row.get(2)?;
                    Ok((active, count, registered_at))
                },
            )
            .optional()?;

        row.map(|(active, associated_record_count, registered_at)| {
            Ok(UserRecord {
                id: *id,
                active,
                associated_record_count,
                registered_at: millis_to_datetime(registered_at)?,
            })
        })
        .transpose()
    }

    /// Loads a prescription record.
    pub fn prescription(&self, id: &PrescriptionId) -> StoreResult<Option<PrescriptionRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT patient, status, issued_at, due_date FROM prescriptions WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let patient: String = row.get(0)?;
                    let status: String = row.get(1)?;
                    let issued_at: i64 = row.get(2)?;
                    let due_date: i64 = row.get(3)?;
                    Ok((patient, status, issued_at, due_date))
                },
            )
            .optional()?;

        row.map(|(patient, status, issued_at, due_date)| {
            Ok(PrescriptionRecord {
                id: *id,
                patient: UserId::parse(&patient)
                    .map_err(|e| StoreError::InvalidData(format!("patient id: {e}")))?,
                status: status
                    .parse()
                    .map_err(|e| StoreError::InvalidData(format!("{e}")))?,
                issued_at: millis_to_datetime(issued_at)?,
                due_date: millis_to_datetime(due_date)?,
            })
        })
        .transpose()
    }

    fn transition(&self, id: &PrescriptionId, to: PrescriptionStatus) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE prescriptions SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.to_string(), id.to_string(), PrescriptionStatus::Valid.to_string()],
        )?;
        if updated == 1 {
            debug!("Prescription {} -> {}", id, to);
            return Ok(());
        }

        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM prescriptions WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match current {
            Some(status) => Err(StoreError::InvalidState(format!(
                "prescription {id} is {status}"
            ))),
            None => Err(StoreError::NotFound(format!("prescription {id}"))),
        }
    }

    fn load_ids<T>(
        &self,
        sql: &str,
        parse: impl Fn(&str) -> medrx_types::Result<T>,
    ) -> StoreResult<Vec<T>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = Vec::new();
        for row in rows {
            let raw = row?;
            result.push(parse(&raw).map_err(|e| StoreError::InvalidData(format!("id {raw}: {e}")))?);
        }
        Ok(result)
    }
}

fn millis_to_datetime(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::InvalidData(format!("timestamp out of range: {millis}")))
}

impl UserStore for SqliteRecordStore {
    fn get(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        self.user(id)
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn list(&self) -> StoreResult<Vec<UserId>> {
        self.load_ids("SELECT id FROM users ORDER BY seq", |s| Ok(UserId::parse(s)?))
    }

    fn deactivate(&self, id: &UserId) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE users SET active = 0 WHERE id = ?1 AND active = 1",
            params![id.to_string()],
        )?;
        if updated == 1 {
            debug!("Deactivated user {}", id);
            return Ok(());
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT seq FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Err(StoreError::InvalidState(format!("user {id} is already inactive"))),
            None => Err(StoreError::NotFound(format!("user {id}"))),
        }
    }
}

impl PrescriptionStore for SqliteRecordStore {
    fn active_ids(&self) -> StoreResult<Vec<PrescriptionId>> {
        self.load_ids(
            "SELECT id FROM prescriptions WHERE status = 'valid' ORDER BY seq",
            |s| Ok(PrescriptionId::parse(s)?),
        )
    }

    fn get(&self, id: &PrescriptionId) -> StoreResult<Option<PrescriptionRecord>> {
        self.prescription(id)
    }

    fn invalidate(&self, id: &PrescriptionId) -> StoreResult<()> {
        self.transition(id, PrescriptionStatus::Invalidated)
    }
}
