//! # Database Error Module
//!
//! This module defines possible errors that could happen while interacting
//! with tier record storage.

use std::{error::Error, fmt};

use crate::game::{Position, Tier};

/* ERROR WRAPPER */

/// Wrapper for all database-related errors that could happen during runtime.
/// This pertains specifically to the elements of the `crate::database`
/// module. I/O failures from the operating system are propagated separately
/// with context attached.
#[derive(Debug)]
pub enum DatabaseError {
    /// An error to indicate that a tier record was requested but has not
    /// been stored, e.g. because a child tier failed to solve.
    MissingTier { tier: Tier },

    /// An error to indicate that a position index was out of the bounds of
    /// the tier record it was used on.
    OutOfBounds { position: Position, size: u64 },

    /// An error to indicate that the contents of a tier record file did not
    /// conform to the expected layout.
    Corrupted { hint: String },
}

impl Error for DatabaseError {}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTier { tier } => {
                write!(f, "No record is stored for tier {tier}.")
            },
            Self::OutOfBounds { position, size } => {
                write!(
                    f,
                    "Position index {position} is out of bounds for a tier \
                    record of size {size}.",
                )
            },
            Self::Corrupted { hint } => {
                write!(f, "Tier record storage is corrupted: {hint}")
            },
        }
    }
}
