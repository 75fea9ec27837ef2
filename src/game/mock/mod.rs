//! # Mock Tier Game Module
//!
//! This module provides a way to represent tiered games by declaring their
//! tiers, transitions, and terminal conditions outright. This makes creating
//! example games for testing a matter of simply describing them, including
//! degenerate shapes a real game would never ship: declared tier cycles,
//! positions with no children, and symmetric twin tiers.

use anyhow::Result;

use std::collections::HashMap;

use crate::game::error::GameError;
use crate::game::Codec;
use crate::game::Implicit;
use crate::game::Position;
use crate::game::Symmetric;
use crate::game::Tier;
use crate::game::TierKind;
use crate::game::TierPosition;
use crate::game::Tiered;
use crate::solver::Value;

/* RE-EXPORTS */

pub use builder::SessionBuilder;

/* SUBMODULES */

mod builder;

/* DEFINITIONS */

/// A declared tier: its position count, its declared child tiers (raw, as a
/// game would report them), and its transition structure.
struct TierDef {
    size: u64,
    children: Vec<Tier>,
    kind: TierKind,
}

/// An initialized session of a declared mock game. Construct one through
/// [`SessionBuilder`].
pub struct Session {
    name: &'static str,
    initial: TierPosition,
    tiers: HashMap<Tier, TierDef>,
    primitives: HashMap<TierPosition, Value>,
    edges: HashMap<TierPosition, Vec<TierPosition>>,
    parents: Option<HashMap<TierPosition, Vec<TierPosition>>>,
    twins: HashMap<Tier, Tier>,
    canonical: HashMap<TierPosition, Position>,
}

/* API IMPLEMENTATION */

impl Session {
    /// Returns the name given to this mock game at declaration.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/* IMPLEMENTATIONS */

impl Tiered for Session {
    fn initial_tier(&self) -> Tier {
        self.initial.tier
    }

    fn initial_position(&self) -> TierPosition {
        self.initial
    }

    fn tier_size(&self, tier: Tier) -> u64 {
        self.tiers
            .get(&tier)
            .map_or(0, |def| def.size)
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        self.tiers
            .get(&tier)
            .map_or_else(Vec::new, |def| def.children.clone())
    }

    fn tier_kind(&self, tier: Tier) -> TierKind {
        self.tiers
            .get(&tier)
            .map_or(TierKind::Loopy, |def| def.kind)
    }
}

impl Symmetric for Session {
    fn canonical_tier(&self, tier: Tier) -> Tier {
        self.twins
            .get(&tier)
            .copied()
            .unwrap_or(tier)
    }

    fn canonical_position(&self, state: TierPosition) -> Position {
        self.canonical
            .get(&state)
            .copied()
            .unwrap_or(state.position)
    }
}

impl Implicit for Session {
    fn legal(&self, state: TierPosition) -> bool {
        self.tiers
            .get(&state.tier)
            .is_some_and(|def| state.position < def.size)
    }

    fn primitive(&self, state: TierPosition) -> Value {
        self.primitives
            .get(&state)
            .copied()
            .unwrap_or(Value::Undecided)
    }

    fn adjacent(&self, state: TierPosition) -> Vec<TierPosition> {
        self.edges
            .get(&state)
            .cloned()
            .unwrap_or_default()
    }

    fn retrograde(&self) -> bool {
        self.parents.is_some()
    }

    fn parents(&self, state: TierPosition, parent: Tier) -> Vec<Position> {
        self.parents
            .as_ref()
            .and_then(|map| map.get(&state))
            .map_or_else(Vec::new, |parents| {
                parents
                    .iter()
                    .filter(|p| p.tier == parent)
                    .map(|p| p.position)
                    .collect()
            })
    }
}

impl Codec for Session {
    fn decode(&self, string: String) -> Result<TierPosition> {
        let (tier, position) = string.split_once(':').ok_or_else(|| {
            GameError::StateMalformed {
                game_name: self.name,
                hint: "Mock states are encoded as 'tier:position'."
                    .to_string(),
            }
        })?;
        Ok(TierPosition {
            tier: tier.parse()?,
            position: position.parse()?,
        })
    }

    fn encode(&self, state: TierPosition) -> Result<String> {
        Ok(format!("{state}"))
    }
}
