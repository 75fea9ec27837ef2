//! # Solver Error Module
//!
//! This module defines possible errors that could happen during the
//! execution of a solving algorithm.

use std::{error::Error, fmt};

use crate::game::Tier;

/* ERROR WRAPPER */

/// Wrapper for all solver-related errors that could happen during runtime.
/// This pertains specifically to the elements of the `crate::solver` module.
#[derive(Debug)]
pub enum SolverError {
    /// An error to indicate that propagating an outcome to its parents would
    /// require a remoteness above the solver's representable maximum. Fatal
    /// to the tier being solved.
    RemotenessOverflow { tier: Tier },

    /// An error to indicate that a buffer the solver grows without bound
    /// (a frontier stratum or a reverse-graph parent list) could not acquire
    /// memory. Fatal to the tier being solved, which is marked failed rather
    /// than drawn.
    OutOfMemory { what: &'static str },

    /// An error to indicate that an encoded record did not conform to the
    /// solver's value/remoteness layout.
    RecordViolation { hint: String },

    /// An error to indicate that the assumptions of a solving algorithm were
    /// detectably violated during execution.
    SolverViolation { hint: String },
}

impl Error for SolverError {}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemotenessOverflow { tier } => {
                write!(
                    f,
                    "Solving tier {tier} required a remoteness beyond the \
                    representable maximum.",
                )
            },
            Self::OutOfMemory { what } => {
                write!(f, "Failed to allocate memory for {what}.")
            },
            Self::RecordViolation { hint } => {
                write!(f, "Malformed solver record: {hint}")
            },
            Self::SolverViolation { hint } => {
                write!(
                    f,
                    "An assumption set by the solver was violated at \
                    runtime: {hint}",
                )
            },
        }
    }
}
