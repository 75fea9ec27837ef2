//! # Interfaces Library
//!
//! This module provides all the available behavior used to interact with
//! the project in different ways, such as the command line.

use std::fmt;

/* INTERFACE IMPLEMENTATIONS */

pub mod terminal;

/* DEFINITIONS */

/// Specifies a mode of operation for solving runs in regard to existing
/// tier records. Constructive runs reuse whatever valid records a previous
/// run left behind and compute only what is missing; overwrite runs discard
/// and recompute everything, which is the only way to react to a changed
/// game implementation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IOMode {
    /// Use existing resources and compute whatever is missing.
    Constructive,

    /// Compute request from scratch, overwriting existing resources.
    Overwrite,
}

/* AUXILIARY IMPLEMENTATIONS */

impl IOMode {
    /// Returns true iff existing tier records should be discarded.
    pub fn force(self) -> bool {
        self == IOMode::Overwrite
    }
}

impl From<bool> for IOMode {
    fn from(force: bool) -> Self {
        if force {
            IOMode::Overwrite
        } else {
            IOMode::Constructive
        }
    }
}

impl fmt::Display for IOMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IOMode::Constructive => write!(f, "constructive"),
            IOMode::Overwrite => write!(f, "overwrite"),
        }
    }
}
