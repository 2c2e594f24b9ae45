//! Entity records for the two maintained domains.
//!
//! Records are owned by their stores. The maintenance core only reads them
//! and asks the store to apply mutations.

use crate::{PrescriptionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The record families swept by the maintenance core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Registered user accounts.
    Users,
    /// Issued prescriptions.
    Prescriptions,
}

impl Domain {
    /// All domains, in plan order.
    pub const ALL: [Domain; 2] = [Domain::Users, Domain::Prescriptions];

    /// Whether mutated entities leave the domain's active index.
    ///
    /// Deactivated users keep their slot; invalidated prescriptions are
    /// removed.
    #[must_use]
    pub const fn removes_on_mutation(&self) -> bool {
        match self {
            Self::Users => false,
            Self::Prescriptions => true,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Users => write!(f, "users"),
            Self::Prescriptions => write!(f, "prescriptions"),
        }
    }
}

/// A registered user as seen by the maintenance core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The user's identifier.
    pub id: UserId,
    /// Whether the account is still active.
    pub active: bool,
    /// Number of records (prescriptions, attestations) linked to the user.
    pub associated_record_count: u32,
    /// When the user registered.
    pub registered_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates an active user with no associated records.
    #[must_use]
    pub fn new(id: UserId, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            active: true,
            associated_record_count: 0,
            registered_at,
        }
    }

    /// Sets the associated record count.
    #[must_use]
    pub fn with_record_count(mut self, count: u32) -> Self {
        self.associated_record_count = count;
        self
    }
}

/// Lifecycle status of a prescription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    /// Issued and still redeemable.
    Valid,
    /// Redeemed at a pharmacy.
    Dispensed,
    /// Withdrawn, usually because its due date passed.
    Invalidated,
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Dispensed => write!(f, "dispensed"),
            Self::Invalidated => write!(f, "invalidated"),
        }
    }
}

impl std::str::FromStr for PrescriptionStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Self::Valid),
            "dispensed" => Ok(Self::Dispensed),
            "invalidated" => Ok(Self::Invalidated),
            other => Err(crate::Error::InvalidStatus(other.to_string())),
        }
    }
}

/// An issued prescription as seen by the maintenance core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    /// The prescription's identifier.
    pub id: PrescriptionId,
    /// The patient the prescription was issued to.
    pub patient: UserId,
    /// Current status.
    pub status: PrescriptionStatus,
    /// When the prescription was issued.
    pub issued_at: DateTime<Utc>,
    /// Last moment the prescription may be redeemed.
    pub due_date: DateTime<Utc>,
}

impl PrescriptionRecord {
    /// Creates a valid prescription.
    #[must_use]
    pub fn new(
        id: PrescriptionId,
        patient: UserId,
        issued_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient,
            status: PrescriptionStatus::Valid,
            issued_at,
            due_date,
        }
    }
}
