//! # Mock Tier Game Builder Module
//!
//! Declarative construction of mock tier game sessions. The builder wires
//! together tiers, edges, primitives, and symmetry twins, infers whatever
//! can be inferred (declared child tiers from edges, tier transition kinds
//! from the presence of intra-tier edges, the parent enumeration from the
//! forward edges), and validates referential integrity at build time.

use anyhow::{bail, Result};

use std::collections::HashMap;

use crate::game::Position;
use crate::game::Tier;
use crate::game::TierKind;
use crate::game::TierPosition;
use crate::game::mock::{Session, TierDef};
use crate::solver::Value;

/* DEFINITIONS */

/// Accumulates the declaration of a mock tier game. See the methods for the
/// declaration surface; [`SessionBuilder::build`] performs validation.
pub struct SessionBuilder {
    name: &'static str,
    initial: Option<TierPosition>,
    sizes: HashMap<Tier, u64>,
    links: Vec<(Tier, Tier)>,
    edges: Vec<(TierPosition, TierPosition)>,
    primitives: Vec<(TierPosition, Value)>,
    twins: Vec<(Tier, Tier)>,
    canonical: Vec<(TierPosition, Position)>,
    retrograde: bool,
}

/* IMPLEMENTATIONS */

impl SessionBuilder {
    pub fn new(name: &'static str) -> Self {
        SessionBuilder {
            name,
            initial: None,
            sizes: HashMap::new(),
            links: Vec::new(),
            edges: Vec::new(),
            primitives: Vec::new(),
            twins: Vec::new(),
            canonical: Vec::new(),
            retrograde: false,
        }
    }

    /// Declares a tier with `size` position indices.
    pub fn tier(mut self, tier: Tier, size: u64) -> Self {
        self.sizes.insert(tier, size);
        self
    }

    /// Declares the initial position.
    pub fn start(mut self, tier: Tier, position: Position) -> Self {
        self.initial = Some(TierPosition { tier, position });
        self
    }

    /// Declares a move edge between two positions.
    pub fn edge(
        mut self,
        from_tier: Tier,
        from_position: Position,
        to_tier: Tier,
        to_position: Position,
    ) -> Self {
        self.edges.push((
            TierPosition {
                tier: from_tier,
                position: from_position,
            },
            TierPosition {
                tier: to_tier,
                position: to_position,
            },
        ));
        self
    }

    /// Declares a position primitive with the given value.
    pub fn primitive(
        mut self,
        tier: Tier,
        position: Position,
        value: Value,
    ) -> Self {
        self.primitives
            .push((TierPosition { tier, position }, value));
        self
    }

    /// Declares a tier-level child link without any position edges, the way
    /// a game's `child_tiers` would report it. Used to declare shapes like
    /// tier cycles that no edge set could produce.
    pub fn link(mut self, parent: Tier, child: Tier) -> Self {
        self.links.push((parent, child));
        self
    }

    /// Declares `raw` to be a symmetric twin of the canonical tier
    /// `canonical`, sharing its position index space.
    pub fn twin(mut self, raw: Tier, canonical: Tier) -> Self {
        self.twins.push((raw, canonical));
        self
    }

    /// Declares the canonical position of `position` within its own tier.
    pub fn canonical(
        mut self,
        tier: Tier,
        position: Position,
        target: Position,
    ) -> Self {
        self.canonical
            .push((TierPosition { tier, position }, target));
        self
    }

    /// Declares that the session enumerates canonical parents itself
    /// (computed here from the forward edges) instead of leaving the solver
    /// to build a reverse position graph.
    pub fn retrograde(mut self) -> Self {
        self.retrograde = true;
        self
    }

    /// Validates the declaration and returns the finished session.
    pub fn build(self) -> Result<Session> {
        let Some(initial) = self.initial else {
            bail!("Mock game '{}' declared no initial position.", self.name)
        };
        if !self.sizes.contains_key(&initial.tier) {
            bail!(
                "Mock game '{}' starts in undeclared tier {}.",
                self.name,
                initial.tier,
            )
        }

        let twins: HashMap<Tier, Tier> = self.twins.into_iter().collect();
        for (&raw, &canonical) in &twins {
            if !self.sizes.contains_key(&raw)
                || !self.sizes.contains_key(&canonical)
            {
                bail!(
                    "Mock game '{}' maps twin tiers {raw}->{canonical}, one \
                    of which is undeclared.",
                    self.name,
                )
            }
            if twins.contains_key(&canonical) {
                bail!(
                    "Mock game '{}' chains twin tiers through {canonical}.",
                    self.name,
                )
            }
        }

        let canonical: HashMap<TierPosition, Position> =
            self.canonical.into_iter().collect();

        let mut children: HashMap<Tier, Vec<Tier>> = HashMap::new();
        for &(parent, child) in &self.links {
            children.entry(parent).or_default().push(child);
        }
        for (from, to) in &self.edges {
            let span = |state: &TierPosition| {
                self.sizes
                    .get(&state.tier)
                    .is_some_and(|&size| state.position < size)
            };
            if !span(from) || !span(to) {
                bail!(
                    "Mock game '{}' has the edge {from}->{to} outside its \
                    declared tiers.",
                    self.name,
                )
            }
            if to.tier != from.tier {
                let siblings = children.entry(from.tier).or_default();
                if !siblings.contains(&to.tier) {
                    siblings.push(to.tier);
                }
            }
        }

        let mut tiers = HashMap::new();
        for (&tier, &size) in &self.sizes {
            let loopy = self
                .edges
                .iter()
                .any(|(from, to)| from.tier == tier && to.tier == tier);
            tiers.insert(
                tier,
                TierDef {
                    size,
                    children: children.remove(&tier).unwrap_or_default(),
                    kind: if loopy {
                        TierKind::Loopy
                    } else {
                        TierKind::ImmediateTransition
                    },
                },
            );
        }

        let resolve = |state: &TierPosition| {
            let tier = twins
                .get(&state.tier)
                .copied()
                .unwrap_or(state.tier);
            let within = TierPosition {
                tier,
                position: state.position,
            };
            TierPosition {
                tier,
                position: canonical
                    .get(&within)
                    .copied()
                    .unwrap_or(within.position),
            }
        };

        let parents = if self.retrograde {
            let mut map: HashMap<TierPosition, Vec<TierPosition>> =
                HashMap::new();
            for (from, to) in &self.edges {
                let child = resolve(to);
                let parent = resolve(from);
                let list = map.entry(child).or_default();
                if !list.contains(&parent) {
                    list.push(parent);
                }
            }
            Some(map)
        } else {
            None
        };

        let mut edges: HashMap<TierPosition, Vec<TierPosition>> =
            HashMap::new();
        for (from, to) in self.edges {
            edges.entry(from).or_default().push(to);
        }

        Ok(Session {
            name: self.name,
            initial,
            tiers,
            primitives: self.primitives.into_iter().collect(),
            edges,
            parents,
            twins,
            canonical,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn games_need_a_starting_position() {
        assert!(SessionBuilder::new("empty").build().is_err());
        assert!(SessionBuilder::new("stray")
            .tier(0, 1)
            .start(1, 0)
            .build()
            .is_err());
    }

    #[test]
    fn edges_through_undeclared_tiers_are_rejected() {
        let result = SessionBuilder::new("dangling")
            .tier(0, 1)
            .start(0, 0)
            .edge(0, 0, 1, 0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn tier_kinds_are_inferred_from_edges() -> Result<()> {
        let game = SessionBuilder::new("kinds")
            .tier(0, 2)
            .tier(1, 1)
            .start(0, 0)
            .edge(0, 0, 0, 1)
            .edge(0, 1, 1, 0)
            .primitive(1, 0, Value::Win)
            .build()?;

        use crate::game::Tiered;
        assert_eq!(game.name(), "kinds");
        assert_eq!(game.tier_kind(0), TierKind::Loopy);
        assert_eq!(game.tier_kind(1), TierKind::ImmediateTransition);
        assert_eq!(game.child_tiers(0), vec![1]);
        Ok(())
    }

    #[test]
    fn inferred_parents_cross_symmetry() -> Result<()> {
        let game = SessionBuilder::new("sym-parents")
            .tier(0, 2)
            .tier(1, 2)
            .tier(2, 2)
            .twin(2, 1)
            .start(0, 0)
            .edge(0, 0, 2, 1)
            .edge(0, 1, 1, 1)
            .primitive(1, 1, Value::Lose)
            .retrograde()
            .build()?;

        use crate::game::Implicit;
        let child = TierPosition {
            tier: 1,
            position: 1,
        };
        let mut parents = game.parents(child, 0);
        parents.sort_unstable();
        assert_eq!(parents, vec![0, 1]);
        Ok(())
    }
}
