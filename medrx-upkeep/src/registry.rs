//! Removable active-entity index.
//!
//! A dense `Vec` of identifiers paired with an identifier → slot map. Removal
//! moves the last identifier into the vacated slot, so add, remove and
//! membership are all O(1). Slot order is only used to give scans a
//! deterministic window; it is not insertion order once removals happen.
//!
//! Invariant: `ids.len() == positions.len()` and `ids[positions[id]] == id`
//! for every tracked identifier.

use medrx_types::Domain;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

use crate::error::MaintenanceError;

/// Registry invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The identifier is already tracked.
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// The identifier is not tracked.
    #[error("identifier not found: {0}")]
    NotFound(String),
}

impl RegistryError {
    /// Attaches the owning domain.
    pub fn in_domain(self, domain: Domain) -> MaintenanceError {
        match self {
            Self::DuplicateIdentifier(id) => MaintenanceError::DuplicateIdentifier { domain, id },
            Self::NotFound(id) => MaintenanceError::NotFound { domain, id },
        }
    }
}

/// An order-stable set of identifiers with O(1) swap-and-shrink removal.
#[derive(Debug, Clone)]
pub struct ActiveIndexRegistry<Id> {
    ids: Vec<Id>,
    positions: HashMap<Id, usize>,
}

impl<Id> Default for ActiveIndexRegistry<Id> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<Id> ActiveIndexRegistry<Id>
where
    Id: Copy + Eq + Hash + fmt::Display,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from identifiers in the given order.
    ///
    /// Fails on the first repeated identifier.
    pub fn from_ids(ids: impl IntoIterator<Item = Id>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for id in ids {
            registry.add(id)?;
        }
        Ok(registry)
    }

    /// Appends an identifier and returns its slot.
    pub fn add(&mut self, id: Id) -> Result<usize, RegistryError> {
        if self.positions.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentifier(id.to_string()));
        }
        let index = self.ids.len();
        self.ids.push(id);
        self.positions.insert(id, index);
        Ok(index)
    }

    /// Removes an identifier, moving the last identifier into its slot.
    pub fn remove(&mut self, id: &Id) -> Result<(), RegistryError> {
        let index = self
            .positions
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        self.ids.swap_remove(index);
        if let Some(moved) = self.ids.get(index) {
            self.positions.insert(*moved, index);
        }
        Ok(())
    }

    /// Returns true if the identifier is tracked.
    #[must_use]
    pub fn contains(&self, id: &Id) -> bool {
        self.positions.contains_key(id)
    }

    /// Returns the number of tracked identifiers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the identifier in the given slot.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Id> {
        self.ids.get(index).copied()
    }

    /// Returns the slot holding the identifier.
    #[must_use]
    pub fn position(&self, id: &Id) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Iterates identifiers in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Id> {
        self.ids.iter()
    }

    /// Returns the identifiers in slot order as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Id] {
        &self.ids
    }

    /// Takes an owned copy of the slot order.
    ///
    /// Later mutations of the registry are not visible through the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot<Id> {
        RegistrySnapshot {
            ids: self.ids.clone(),
        }
    }

    /// Checks the sequence/map invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.ids.len() == self.positions.len()
            && self
                .positions
                .iter()
                .all(|(id, &index)| self.ids.get(index) == Some(id))
    }
}

/// Point-in-time copy of a registry's slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot<Id> {
    ids: Vec<Id>,
}

impl<Id> RegistrySnapshot<Id> {
    /// Number of identifiers captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The captured identifiers in slot order.
    #[must_use]
    pub fn as_slice(&self) -> &[Id] {
        &self.ids
    }

    /// Iterates the captured identifiers.
    pub fn iter(&self) -> std::slice::Iter<'_, Id> {
        self.ids.iter()
    }
}

impl<Id> IntoIterator for RegistrySnapshot<Id> {
    type Item = Id;
    type IntoIter = std::vec::IntoIter<Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}
