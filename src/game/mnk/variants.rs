//! # MNK Variant Handling Module
//!
//! This module helps parse the variant string provided to the MNK game into
//! board dimensions and a winning row length.

use anyhow::Result;
use regex::Regex;

use crate::game::error::GameError;
use crate::game::mnk::Session;
use crate::game::mnk::NAME;

/* MNK VARIANT ENCODING */

pub const VARIANT_DEFAULT: &str = "3-3-3";
pub const VARIANT_PATTERN: &str = r"^[1-9]\d*-[1-9]\d*-[1-9]\d*$";
pub const VARIANT_PROTOCOL: &str = "The variant should be three \
dash-separated positive integers 'm-n-k': the number of board rows, the \
number of board columns, and the number of aligned pieces needed to win. \
For example, '3-3-3' is standard Tic-Tac-Toe and '4-4-3' plays it on a \
wider board. The board may hold at most 16 cells, and k cannot exceed the \
longer board dimension.";

/// Most cells a variant's board may have. Bounds the per-tier position
/// space at 3^16 indices.
const MAX_CELLS: usize = 16;

/* API */

/// Returns an MNK game session set up using the parameters specified by
/// `variant`. Returns a [`GameError::VariantMalformed`] error if the
/// variant string does not conform to the variant protocol.
pub fn parse_variant(variant: String) -> Result<Session> {
    check_variant_pattern(&variant)?;
    let params = parse_parameters(&variant)?;

    let rows = params[0] as usize;
    let cols = params[1] as usize;
    let k = params[2] as usize;
    if rows * cols > MAX_CELLS {
        Err(GameError::VariantMalformed {
            game_name: NAME,
            hint: format!(
                "A {rows}x{cols} board has more than {MAX_CELLS} cells.",
            ),
        })?
    }
    if k > rows.max(cols) {
        Err(GameError::VariantMalformed {
            game_name: NAME,
            hint: format!(
                "No {k} pieces can align on a {rows}x{cols} board.",
            ),
        })?
    }

    Ok(Session::assemble(rows, cols, k))
}

/* VARIANT STRING VERIFICATION */

fn parse_parameters(variant: &str) -> Result<Vec<u64>, GameError> {
    variant
        .split('-')
        .map(|int_string| {
            int_string
                .parse::<u64>()
                .map_err(|e| GameError::VariantMalformed {
                    game_name: NAME,
                    hint: e.to_string(),
                })
        })
        .collect()
}

fn check_variant_pattern(variant: &str) -> Result<(), GameError> {
    let re = Regex::new(VARIANT_PATTERN).unwrap();
    if !re.is_match(variant) {
        Err(GameError::VariantMalformed {
            game_name: NAME,
            hint: format!(
                "String does not match the pattern '{VARIANT_PATTERN}'.",
            ),
        })
    } else {
        Ok(())
    }
}

/* TESTS */
