//! Staleness predicates and windowed scanning.
//!
//! Everything here is pure: no store access, no clock reads. Callers pass the
//! reference time explicitly so a check and its execute can be evaluated
//! against different instants.

use crate::cursor::ScanWindow;
use crate::error::{MaintenanceError, MaintenanceResult};
use chrono::{DateTime, Duration, Utc};
use medrx_types::{PrescriptionRecord, PrescriptionStatus, UserRecord};

/// Default inactivity period before an unused account is considered stale.
pub const DEFAULT_INACTIVITY_PERIOD_DAYS: i64 = 365;

/// An active user with no linked records whose registration is older than
/// `inactivity_period`.
#[must_use]
pub fn is_stale_user(
    active: bool,
    associated_record_count: u32,
    registered_at: DateTime<Utc>,
    now: DateTime<Utc>,
    inactivity_period: Duration,
) -> bool {
    active
        && associated_record_count == 0
        && now.signed_duration_since(registered_at) > inactivity_period
}

/// A prescription still marked valid whose due date has passed.
#[must_use]
pub fn is_stale_prescription(
    status: PrescriptionStatus,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    status == PrescriptionStatus::Valid && now > due_date
}

/// Yields the identifiers in `window` that satisfy `predicate`.
///
/// The iterator is lazy and holds no state beyond its arguments, so calling
/// `scan` again with the same inputs yields the same sequence. A predicate
/// error is yielded in place and does not stop iteration; callers that treat
/// it as fatal should stop at the first `Err`.
pub fn scan<Id, E, P>(
    ids: &[Id],
    window: ScanWindow,
    mut predicate: P,
) -> impl Iterator<Item = Result<Id, E>>
where
    Id: Copy,
    P: FnMut(&Id) -> Result<bool, E>,
{
    let end = window.end.min(ids.len());
    let start = window.start.min(end);
    ids[start..end]
        .iter()
        .filter_map(move |id| match predicate(id) {
            Ok(true) => Some(Ok(*id)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        })
}

/// A domain's eligibility rule.
pub trait StalenessRule {
    /// The record shape the rule inspects.
    type Record;

    /// Returns true if the record should be mutated at `now`.
    fn is_stale(&self, record: &Self::Record, now: DateTime<Utc>) -> bool;
}

/// Deactivation rule for users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserInactivity {
    inactivity_period: Duration,
}

impl UserInactivity {
    /// Creates the rule. A non-positive period is rejected.
    pub fn new(inactivity_period: Duration) -> MaintenanceResult<Self> {
        if inactivity_period <= Duration::zero() {
            return Err(MaintenanceError::InvalidConfiguration(
                "inactivity period must be positive".to_string(),
            ));
        }
        Ok(Self { inactivity_period })
    }

    /// The configured period.
    #[must_use]
    pub fn inactivity_period(&self) -> Duration {
        self.inactivity_period
    }
}

impl Default for UserInactivity {
    fn default() -> Self {
        Self {
            inactivity_period: Duration::days(DEFAULT_INACTIVITY_PERIOD_DAYS),
        }
    }
}

impl StalenessRule for UserInactivity {
    type Record = UserRecord;

    fn is_stale(&self, record: &UserRecord, now: DateTime<Utc>) -> bool {
        is_stale_user(
            record.active,
            record.associated_record_count,
            record.registered_at,
            now,
            self.inactivity_period,
        )
    }
}

/// Invalidation rule for prescriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrescriptionExpiry;

impl StalenessRule for PrescriptionExpiry {
    type Record = PrescriptionRecord;

    fn is_stale(&self, record: &PrescriptionRecord, now: DateTime<Utc>) -> bool {
        is_stale_prescription(record.status, record.due_date, now)
    }
}
