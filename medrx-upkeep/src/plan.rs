//! Execution plans and their wire encoding.
//!
//! A plan is the per-domain list of identifiers a check judged eligible. It
//! crosses the check/execute boundary as bytes:
//!
//! ```text
//! u32 BE  user count       | count × 16-byte user UUID
//! u32 BE  prescription cnt | count × 16-byte prescription UUID
//! ```
//!
//! Domains appear in `Domain::ALL` order. Truncated input, oversized counts
//! and trailing bytes are all rejected.

use medrx_types::{Domain, PrescriptionId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum identifiers accepted per domain list.
pub const MAX_PLAN_ENTRIES: usize = 10_000;

const ID_LEN: usize = 16;
const COUNT_LEN: usize = 4;

/// Errors decoding plan bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanCodecError {
    /// Input ended before a complete field.
    #[error("truncated plan: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Offset of the incomplete field.
        offset: usize,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// A domain list declares more entries than allowed.
    #[error("{domain} list too large: {count} entries (max {MAX_PLAN_ENTRIES})")]
    TooManyEntries {
        /// Domain of the oversized list.
        domain: Domain,
        /// Declared count.
        count: usize,
    },

    /// Bytes remain after the last domain list.
    #[error("{0} trailing bytes after plan")]
    TrailingBytes(usize),
}

/// Identifiers judged eligible during one check, grouped by domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    users: Vec<UserId>,
    prescriptions: Vec<PrescriptionId>,
}

impl ExecutionPlan {
    /// Creates a plan from per-domain lists.
    #[must_use]
    pub fn new(users: Vec<UserId>, prescriptions: Vec<PrescriptionId>) -> Self {
        Self {
            users,
            prescriptions,
        }
    }

    /// The plan with nothing to do.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Users to deactivate.
    #[must_use]
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Prescriptions to invalidate.
    #[must_use]
    pub fn prescriptions(&self) -> &[PrescriptionId] {
        &self.prescriptions
    }

    /// Number of identifiers planned for one domain.
    #[must_use]
    pub fn domain_len(&self, domain: Domain) -> usize {
        match domain {
            Domain::Users => self.users.len(),
            Domain::Prescriptions => self.prescriptions.len(),
        }
    }

    /// Combined identifier count across domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len() + self.prescriptions.len()
    }

    /// Returns true if no domain has work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encodes the plan as length-prefixed domain lists.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 * COUNT_LEN + self.len() * ID_LEN);
        write_list(&mut buf, self.users.iter().map(UserId::as_bytes));
        write_list(&mut buf, self.prescriptions.iter().map(PrescriptionId::as_bytes));
        buf
    }

    /// Decodes bytes produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, PlanCodecError> {
        let mut reader = Reader { bytes, offset: 0 };
        let users = reader.read_list(Domain::Users, UserId::from_bytes)?;
        let prescriptions = reader.read_list(Domain::Prescriptions, PrescriptionId::from_bytes)?;

        let rest = bytes.len() - reader.offset;
        if rest != 0 {
            return Err(PlanCodecError::TrailingBytes(rest));
        }
        Ok(Self {
            users,
            prescriptions,
        })
    }
}

fn write_list<'a>(buf: &mut Vec<u8>, ids: impl ExactSizeIterator<Item = &'a [u8; ID_LEN]>) {
    buf.extend_from_slice(&(ids.len() as u32).to_be_bytes());
    for id in ids {
        buf.extend_from_slice(id);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, needed: usize) -> Result<&'a [u8], PlanCodecError> {
        let available = self.bytes.len() - self.offset;
        if available < needed {
            return Err(PlanCodecError::Truncated {
                offset: self.offset,
                needed,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn read_list<T>(
        &mut self,
        domain: Domain,
        make: impl Fn([u8; ID_LEN]) -> T,
    ) -> Result<Vec<T>, PlanCodecError> {
        let mut count_bytes = [0u8; COUNT_LEN];
        count_bytes.copy_from_slice(self.take(COUNT_LEN)?);
        let count = u32::from_be_bytes(count_bytes) as usize;
        if count > MAX_PLAN_ENTRIES {
            return Err(PlanCodecError::TooManyEntries { domain, count });
        }

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let mut raw = [0u8; ID_LEN];
            raw.copy_from_slice(self.take(ID_LEN)?);
            ids.push(make(raw));
        }
        Ok(ids)
    }
}

/// Result of a check phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// True iff the plan holds at least one identifier.
    pub needed: bool,
    /// The per-domain eligible identifiers.
    pub plan: ExecutionPlan,
}

impl CheckOutcome {
    /// Wraps a plan, deriving `needed` from its contents.
    #[must_use]
    pub fn from_plan(plan: ExecutionPlan) -> Self {
        Self {
            needed: !plan.is_empty(),
            plan,
        }
    }

    /// Encodes the plan for hand-off to the execute phase.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.plan.encode()
    }
}
