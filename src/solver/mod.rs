//! # Solver Module
//!
//! This module provides behavior for the systematic traversal of tiered game
//! graphs with the objective of computing their strong solutions: a value
//! and a remoteness for every legal canonical position. The traversal is
//! retrograde; entire tiers are finished bottom-up in the order maintained
//! by the manager, and each tier is labeled by a parallel backward-induction
//! worker.

use std::fmt;

use crate::solver::error::SolverError;

/* UTILITY MODULES */

#[cfg(test)]
mod test;

pub mod error;

/* MODULES */

pub mod frontier;
pub mod graph;
pub mod manager;
pub mod worker;
pub mod dispatch {
    //! # Dispatch Module
    //!
    //! Implementations of the layer under the tier manager that assigns
    //! "solve this tier" work units to workers.

    pub mod pool;
    pub mod remote;

    mod model;
    pub use model::*;
}

/* TYPES */

/// Indicates the number of choices that players have to make to reach a
/// terminal position in a game under perfect play. For tying positions,
/// indicates the number of choices players can make to bring the game to a
/// terminal tying position. Meaningless for drawn positions.
pub type Remoteness = u16;

/// The inclusive upper bound on remoteness values the solver can represent.
/// A propagation that would exceed this bound fails the tier being solved.
pub const MAX_REMOTENESS: Remoteness = 1023;

/// The game-theoretic value of a position from the perspective of the player
/// whose turn it is. [`Value::Undecided`] is the pre-solve state, which
/// persists in solved records only for illegal and non-canonical position
/// indices. [`Value::Draw`] denotes a position from which neither player can
/// force an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Value {
    Undecided = 0,
    Lose = 1,
    Tie = 2,
    Win = 3,
    Draw = 4,
}

/// The solved assessment of a single position; what the solver computes and
/// the database persists, one per position index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub value: Value,
    pub remoteness: Remoteness,
}

/* IMPLEMENTATIONS */

impl Value {
    /// Returns true iff this value carries a meaningful remoteness, i.e. it
    /// participates in frontier propagation.
    pub fn concrete(self) -> bool {
        matches!(self, Value::Lose | Value::Tie | Value::Win)
    }
}

impl TryFrom<u8> for Value {
    type Error = SolverError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Value::Undecided),
            1 => Ok(Value::Lose),
            2 => Ok(Value::Tie),
            3 => Ok(Value::Win),
            4 => Ok(Value::Draw),
            _ => Err(SolverError::RecordViolation {
                hint: format!("No value is encoded by the byte {raw}."),
            }),
        }
    }
}

impl Outcome {
    /// The state of every position before anything is known about it.
    pub const UNDECIDED: Outcome = Outcome {
        value: Value::Undecided,
        remoteness: 0,
    };
}

/* AUXILIARY IMPLEMENTATIONS */

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undecided => write!(f, "undecided"),
            Value::Lose => write!(f, "lose"),
            Value::Tie => write!(f, "tie"),
            Value::Win => write!(f, "win"),
            Value::Draw => write!(f, "draw"),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Win | Value::Lose | Value::Tie => {
                write!(f, "{} in {}", self.value, self.remoteness)
            },
            _ => write!(f, "{}", self.value),
        }
    }
}
