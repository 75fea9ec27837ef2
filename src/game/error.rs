//! # Game Error Module
//!
//! This module defines possible errors that could happen as a result of user
//! input or an incomplete game implementation.

use std::{error::Error, fmt};

use crate::game::Tier;

/* ERROR WRAPPER */

/// Wrapper for all game-related errors that could happen during runtime.
/// Note that the elements of this enumeration are all related to the
/// implementation of interface elements in `crate::game::mod`.
#[derive(Debug)]
pub enum GameError {
    /// An error to indicate that the variant passed to the game with
    /// `game_name` was not in a format the game could parse. Includes a
    /// message from the game implementation on exactly what went wrong. Note
    /// that `game_name` should be a valid argument to the CLI.
    VariantMalformed {
        game_name: &'static str,
        hint: String,
    },

    /// An error to indicate that the position string passed to the game with
    /// `game_name` was not in a format the game could parse. Includes a
    /// message from the game implementation on exactly what went wrong.
    StateMalformed {
        game_name: &'static str,
        hint: String,
    },

    /// An error to indicate that the tier graph declared by a game contains
    /// a cycle through `tier`, which makes a bottom-up solving order
    /// impossible. Fatal to the entire run.
    TierCycle { tier: Tier },

    /// An error to indicate that a game implementation broke one of the
    /// contracts the solver relies on, such as providing a non-primitive
    /// legal position with no children, or a child count that does not fit
    /// the solver's counter width. Fatal to the entire run.
    ContractViolation { hint: String },
}

impl Error for GameError {}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::VariantMalformed { game_name, hint } => {
                write!(
                    f,
                    "{hint}\n\nMore information on how {game_name} expects \
                    you to format variant encodings can be found with \
                    'strata help'.",
                )
            },
            Self::StateMalformed { game_name, hint } => {
                write!(
                    f,
                    "{hint}\n\nMore information on how {game_name} expects \
                    you to format position encodings can be found with \
                    'strata help'.",
                )
            },
            Self::TierCycle { tier } => {
                write!(
                    f,
                    "The game's declared tier graph contains a cycle through \
                    tier {tier}, so no bottom-up solving order exists.",
                )
            },
            Self::ContractViolation { hint } => {
                write!(
                    f,
                    "The game implementation violated a solver assumption: \
                    {hint}",
                )
            },
        }
    }
}
