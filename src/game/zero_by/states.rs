//! # Zero-By State Handling Module
//!
//! This module helps parse the position strings the Zero-By game accepts
//! through its string protocol into tier positions, and validates them
//! against the session's variant parameters.

use anyhow::Result;
use regex::Regex;

use crate::game::error::GameError;
use crate::game::zero_by::Session;
use crate::game::zero_by::NAME;
use crate::game::TierPosition;

/* ZERO-BY STATE ENCODING */

pub const STATE_DEFAULT: &str = "10-0";
pub const STATE_PATTERN: &str = r"^\d+-[01]$";
pub const STATE_PROTOCOL: &str = "The state string should be two \
dash-separated integers. The first is the number of elements left in the \
set, which cannot exceed the variant's starting amount, and the second is \
the player whose turn it is (0 or 1).";

/* API */

/// Returns the tier position encoded by `string` under the parameters of
/// `session`, or a [`GameError::StateMalformed`] error.
pub fn decode_state_string(
    session: &Session,
    string: String,
) -> Result<TierPosition> {
    let re = Regex::new(STATE_PATTERN).unwrap();
    if !re.is_match(&string) {
        Err(GameError::StateMalformed {
            game_name: NAME,
            hint: format!(
                "String does not match the pattern '{STATE_PATTERN}'.",
            ),
        })?
    }

    let (elements, turn) = string
        .split_once('-')
        .expect("Pattern guarantees one dash.");
    let elements = elements
        .parse::<u64>()
        .map_err(|e| GameError::StateMalformed {
            game_name: NAME,
            hint: e.to_string(),
        })?;
    let turn = turn
        .parse::<u64>()
        .map_err(|e| GameError::StateMalformed {
            game_name: NAME,
            hint: e.to_string(),
        })?;

    if elements > session.start {
        Err(GameError::StateMalformed {
            game_name: NAME,
            hint: format!(
                "State has {elements} elements, but this variant starts \
                with {}.",
                session.start,
            ),
        })?
    }

    Ok(TierPosition {
        tier: elements,
        position: turn,
    })
}

/* TESTS */

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn state_pattern_is_valid_regex() {
        assert!(Regex::new(STATE_PATTERN).is_ok());
    }

    #[test]
    fn default_state_matches_state_pattern() {
        let re = Regex::new(STATE_PATTERN).unwrap();
        assert!(re.is_match(STATE_DEFAULT));
    }

    #[test]
    fn states_decode_against_session_bounds() {
        let session = Session::default();
        assert!(decode_state_string(&session, "10-0".into()).is_ok());
        assert!(decode_state_string(&session, "0-1".into()).is_ok());
        assert!(decode_state_string(&session, "11-0".into()).is_err());
        assert!(decode_state_string(&session, "3-2".into()).is_err());
        assert!(decode_state_string(&session, "three-0".into()).is_err());
    }
}
