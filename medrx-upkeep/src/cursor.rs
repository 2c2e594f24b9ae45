//! Per-domain scan position.
//!
//! A cursor hands out one bounded window of the active index per cycle and
//! is advanced once after the cycle's mutations land. Advancing uses the
//! domain size *after* mutation, so removals pull the cursor back into range
//! on their own.

use crate::error::{MaintenanceError, MaintenanceResult};
use crate::plan::MAX_PLAN_ENTRIES;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default number of identifiers examined per domain per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Half-open slot range `[start, end)` of an active index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    /// First slot included.
    pub start: usize,
    /// First slot excluded.
    pub end: usize,
}

impl ScanWindow {
    /// The empty window.
    pub const EMPTY: ScanWindow = ScanWindow { start: 0, end: 0 };

    /// Number of slots covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the window covers no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The window as a slice range.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Resumable position within one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCursor {
    position: usize,
    batch_size: usize,
}

impl BatchCursor {
    /// Creates a cursor at slot zero.
    pub fn new(batch_size: usize) -> MaintenanceResult<Self> {
        validate_batch_size(batch_size)?;
        Ok(Self {
            position: 0,
            batch_size,
        })
    }

    /// Restores a persisted cursor against the current domain size.
    ///
    /// The position is reduced modulo the domain size to keep
    /// `position < max(domain_count, 1)`.
    pub fn restore(state: CursorState, domain_count: usize) -> MaintenanceResult<Self> {
        let mut cursor = Self::new(state.batch_size)?;
        cursor.position = if domain_count == 0 {
            0
        } else {
            state.position % domain_count
        };
        Ok(cursor)
    }

    /// Current slot.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of slots per window.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Changes the window width. Zero and widths above
    /// [`MAX_PLAN_ENTRIES`] are rejected.
    pub fn set_batch_size(&mut self, batch_size: usize) -> MaintenanceResult<()> {
        validate_batch_size(batch_size)?;
        self.batch_size = batch_size;
        Ok(())
    }

    /// The window to scan for a domain of `domain_count` identifiers.
    ///
    /// Never mutates the cursor; never extends past `domain_count`.
    #[must_use]
    pub fn window(&self, domain_count: usize) -> ScanWindow {
        if domain_count == 0 {
            return ScanWindow::EMPTY;
        }
        let end = self.position.saturating_add(self.batch_size).min(domain_count);
        ScanWindow {
            start: self.position.min(end),
            end,
        }
    }

    /// Moves forward one batch, wrapping modulo the post-mutation domain size.
    pub fn advance(&mut self, domain_count_after_mutation: usize) {
        let n = domain_count_after_mutation;
        self.position = if n == 0 {
            0
        } else {
            (self.position % n + self.batch_size % n) % n
        };
    }

    /// Re-clamps the position after the domain shrank outside a cycle.
    pub(crate) fn clamp(&mut self, domain_count: usize) {
        if domain_count == 0 {
            self.position = 0;
        } else if self.position >= domain_count {
            self.position %= domain_count;
        }
    }

    /// Exports the cursor for persistence.
    #[must_use]
    pub fn state(&self) -> CursorState {
        CursorState {
            position: self.position,
            batch_size: self.batch_size,
        }
    }
}

/// Serializable cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Slot the next window starts at.
    pub position: usize,
    /// Window width.
    pub batch_size: usize,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            position: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// A window wider than a plan can carry would yield plans that fail to decode.
pub(crate) fn validate_batch_size(batch_size: usize) -> MaintenanceResult<()> {
    if batch_size == 0 {
        return Err(MaintenanceError::InvalidConfiguration(
            "batch size must be positive".to_string(),
        ));
    }
    if batch_size > MAX_PLAN_ENTRIES {
        return Err(MaintenanceError::InvalidConfiguration(format!(
            "batch size {batch_size} exceeds {MAX_PLAN_ENTRIES}"
        )));
    }
    Ok(())
}
