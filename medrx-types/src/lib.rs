//! Core type definitions for the medrx maintenance engine.
//!
//! This crate defines the fundamental types shared by the stores and the
//! maintenance core:
//! - User, prescription and principal identifiers (UUID v7)
//! - User and prescription records
//! - The `Domain` enum naming each maintained record family

mod ids;
mod record;

pub use ids::{PrescriptionId, Principal, UserId};
pub use record::{Domain, PrescriptionRecord, PrescriptionStatus, UserRecord};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid prescription status: {0}")]
    InvalidStatus(String),
}
