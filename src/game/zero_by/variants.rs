//! # Zero-By Variant Handling Module
//!
//! This module helps parse the variant string provided to the Zero-By game
//! into parameters that can help build a game session.

use anyhow::Result;
use regex::Regex;

use crate::game::error::GameError;
use crate::game::zero_by::Session;
use crate::game::zero_by::NAME;

/* ZERO-BY VARIANT ENCODING */

pub const VARIANT_DEFAULT: &str = "10-1-2";
pub const VARIANT_PATTERN: &str = r"^[1-9]\d*(?:-[1-9]\d*)+$";
pub const VARIANT_PROTOCOL: &str = "The variant should be a dash-separated \
group of two or more positive integers. For example, '232-23-6-3-6' is valid \
but '598', '-23-1-5', and 'fifteen-2-5' are not. The first integer is the \
number of elements in the set at the start of the game. The rest are the \
amounts of elements that a player may remove on their turn. Note that the \
amounts can repeat, with no consequence beyond a slight decrease in \
performance. The game is always played by two players; the one who is left \
with zero elements on their turn loses.";

/* API */

/// Returns a zero-by game session set up using the parameters specified by
/// `variant`. Returns a [`GameError::VariantMalformed`] error if the variant
/// string does not conform to the variant protocol.
pub fn parse_variant(variant: String) -> Result<Session> {
    check_variant_pattern(&variant)?;
    let params = parse_parameters(&variant)?;
    check_param_count(&params)?;

    Ok(Session {
        start: params[0],
        by: Vec::from(&params[1..]),
        variant,
    })
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

fn check_param_count(params: &[u64]) -> Result<(), GameError> {
    if params.len() < 2 {
        Err(GameError::VariantMalformed {
            game_name: NAME,
            hint: "String needs to have at least 2 dash-separated integers."
                .to_string(),
        })
    } else {
        Ok(())
    }
}

/* TESTS */
