//! # Game Utilities Module
//!
//! This module provides common behavior derived from the interfaces in
//! `crate::game::mod`, chiefly the resolution of raw game transitions into
//! the canonical forms that solvers and databases operate on.

use crate::game::Symmetric;
use crate::game::TierGame;
use crate::game::{Tier, TierPosition};

/* CANONICAL RESOLUTION */

/// Returns the canonical form of `state`: the canonical position within the
/// canonical twin of its tier. Non-canonical tiers are crossed through
/// [`Symmetric::symmetric_position`] first, so the result always lies in a
/// canonical tier.
pub fn canonicalize<G: TierGame + ?Sized>(
    game: &G,
    state: TierPosition,
) -> TierPosition {
    let tier = game.canonical_tier(state.tier);
    let state = if tier == state.tier {
        state
    } else {
        TierPosition {
            tier,
            position: game.symmetric_position(state, tier),
        }
    };
    TierPosition {
        tier,
        position: game.canonical_position(state),
    }
}

/// Returns the canonical children of `state`, sorted and deduplicated. This
/// is the child collection whose cardinality the solver tracks per position;
/// the game's [`crate::game::Implicit::parents`] enumeration (when provided)
/// must be mutual with it.
pub fn children<G: TierGame + ?Sized>(
    game: &G,
    state: TierPosition,
) -> Vec<TierPosition> {
    let mut next = game
        .adjacent(state)
        .into_iter()
        .map(|child| canonicalize(game, child))
        .collect::<Vec<TierPosition>>();
    next.sort_unstable();
    next.dedup();
    next
}

/// Returns the canonical child tiers of `tier`, sorted and deduplicated,
/// together with the number of raw child references that resolved to a
/// different (canonical) tier than the one the game returned.
pub fn canonical_child_tiers<G: TierGame + ?Sized>(
    game: &G,
    tier: Tier,
) -> (Vec<Tier>, u64) {
    let mut skipped = 0;
    let mut children = game
        .child_tiers(tier)
        .into_iter()
        .map(|child| {
            let canonical = game.canonical_tier(child);
            if canonical != child {
                skipped += 1;
            }
            canonical
        })
        .collect::<Vec<Tier>>();
    children.sort_unstable();
    children.dedup();
    (children, skipped)
}
