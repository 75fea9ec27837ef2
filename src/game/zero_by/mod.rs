//! # Zero-By Game Module
//!
//! Zero-By is a simple game where two players take turns removing one of
//! certain amounts of elements from a set of N elements; the player left
//! with zero elements on their turn loses. The set size only ever shrinks,
//! which makes the remaining element count a natural tier: every move lands
//! in a smaller tier, and a tier's two positions are the players who could
//! be to move at that count.

use anyhow::Result;

use crate::game::zero_by::states::*;
use crate::game::zero_by::variants::*;
use crate::game::Codec;
use crate::game::GameData;
use crate::game::Implicit;
use crate::game::Information;
use crate::game::Position;
use crate::game::StringProtocol;
use crate::game::Symmetric;
use crate::game::Tier;
use crate::game::TierKind;
use crate::game::TierPosition;
use crate::game::Tiered;
use crate::game::Variable;
use crate::game::Variant;
use crate::solver::Value;

/* SUBMODULES */

mod states;
mod variants;

/* GAME DATA */

const NAME: &str = "zero-by";
const AUTHORS: &str = "Max Fierro <maxfierro@berkeley.edu>";
const ABOUT: &str = "Two players take turns removing a number of elements \
from a set of arbitrary size. The game variant determines how many elements \
are in the set to begin with, and the options players have in the amount of \
elements to remove during their turn. The player who is left with 0 elements \
in their turn loses. A player cannot remove more elements than currently \
available in the set.";

/* GAME IMPLEMENTATION */

pub struct Session {
    start: u64,
    by: Vec<u64>,
    variant: Variant,
}

impl Session {
    pub fn new(variant: Option<Variant>) -> Result<Self> {
        if let Some(v) = variant {
            Self::variant(v)
        } else {
            Ok(Self::default())
        }
    }

    fn removal(&self, elements: u64, choice: u64) -> u64 {
        if elements <= choice {
            elements
        } else {
            choice
        }
    }
}

/* IMPLEMENTATIONS */

impl Default for Session {
    fn default() -> Self {
        parse_variant(VARIANT_DEFAULT.to_owned())
            .expect("Failed to parse default variant.")
    }
}

impl Information for Session {
    fn info() -> GameData {
        GameData {
            name: NAME,
            authors: AUTHORS,
            about: ABOUT,

            variant: StringProtocol {
                explanation: VARIANT_PROTOCOL,
                pattern: VARIANT_PATTERN,
                default: VARIANT_DEFAULT,
            },

            state: StringProtocol {
                explanation: STATE_PROTOCOL,
                pattern: STATE_PATTERN,
                default: STATE_DEFAULT,
            },
        }
    }
}

impl Variable for Session {
    fn variant(variant: Variant) -> Result<Self> {
        parse_variant(variant)
    }
}

impl Tiered for Session {
    fn initial_tier(&self) -> Tier {
        self.start
    }

    fn initial_position(&self) -> TierPosition {
        TierPosition {
            tier: self.start,
            position: 0,
        }
    }

    fn tier_size(&self, _tier: Tier) -> u64 {
        2
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        if tier == 0 {
            return Vec::new();
        }
        self.by
            .iter()
            .map(|&choice| tier - self.removal(tier, choice))
            .collect()
    }

    fn tier_kind(&self, _tier: Tier) -> TierKind {
        TierKind::ImmediateTransition
    }
}

impl Symmetric for Session {}

impl Implicit for Session {
    fn legal(&self, state: TierPosition) -> bool {
        state.tier <= self.start && state.position < 2
    }

    fn primitive(&self, state: TierPosition) -> Value {
        if state.tier == 0 {
            Value::Lose
        } else {
            Value::Undecided
        }
    }

    fn adjacent(&self, state: TierPosition) -> Vec<TierPosition> {
        if state.tier == 0 {
            return Vec::new();
        }
        self.by
            .iter()
            .map(|&choice| TierPosition {
                tier: state.tier - self.removal(state.tier, choice),
                position: 1 - state.position,
            })
            .collect()
    }

    fn retrograde(&self) -> bool {
        true
    }

    fn parents(&self, state: TierPosition, parent: Tier) -> Vec<Position> {
        let reachable = parent <= self.start
            && parent > state.tier
            && self
                .by
                .iter()
                .any(|&choice| {
                    parent - self.removal(parent, choice) == state.tier
                });
        if reachable {
            vec![1 - state.position]
        } else {
            Vec::new()
        }
    }
}

impl Codec for Session {
    fn decode(&self, string: String) -> Result<TierPosition> {
        decode_state_string(self, string)
    }

    fn encode(&self, state: TierPosition) -> Result<String> {
        Ok(format!("{}-{}", state.tier, state.position))
    }
}

/* TESTS */
