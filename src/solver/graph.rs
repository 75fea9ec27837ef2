//! # Reverse Graph Module
//!
//! Reverse adjacency structures used by retrograde analysis. The reverse
//! tier graph maps each canonical tier to the canonical tiers that depend on
//! it, and is consumed as tiers finish solving. The reverse position graph
//! is a per-tier-solve structure mapping child positions to their parents in
//! the tier being solved, built on the fly for games that cannot enumerate
//! parents themselves.

use anyhow::Result;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::game::{Position, Tier, TierGame, TierPosition};
use crate::solver::error::SolverError;

/* REVERSE TIER GRAPH */

/// Maps each canonical child tier to its deduplicated canonical parent
/// tiers. Edges are registered during discovery and popped as their child
/// tier finishes solving, so the graph is empty at the end of a run.
#[derive(Default, Debug)]
pub struct ReverseTierGraph {
    edges: HashMap<Tier, Vec<Tier>>,
}

impl ReverseTierGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parent` as depending on `child`. Duplicate registrations
    /// of the same edge are collapsed, so that two symmetric parent tiers
    /// canonicalizing to the same tier count once.
    pub fn add(&mut self, child: Tier, parent: Tier) {
        let parents = self.edges.entry(child).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Removes and returns the parents registered for `child`.
    pub fn pop(&mut self, child: Tier) -> Vec<Tier> {
        self.edges.remove(&child).unwrap_or_default()
    }

    /// Returns the number of parents currently registered for `child`.
    pub fn count(&self, child: Tier) -> usize {
        self.edges
            .get(&child)
            .map_or(0, |parents| parents.len())
    }
}

/* REVERSE POSITION GRAPH */

/// Maps each child position of a tier group to its parents in the tier
/// being solved. One slot exists per position of every tier in the group;
/// slots are appended to concurrently during the tier scan under per-slot
/// mutexes, then consumed read-once during propagation.
pub struct ReversePositionGraph {
    spans: HashMap<Tier, (usize, u64)>,
    slots: Vec<Mutex<Vec<Position>>>,
}

impl ReversePositionGraph {
    /// Returns an empty reverse position graph spanning `tiers`, which must
    /// be the solving tier's group (its canonical child tiers plus itself).
    pub fn new<G: TierGame + ?Sized>(game: &G, tiers: &[Tier]) -> Self {
        let mut spans = HashMap::with_capacity(tiers.len());
        let mut total = 0usize;
        for &tier in tiers {
            let size = game.tier_size(tier);
            spans.insert(tier, (total, size));
            total += size as usize;
        }

        let mut slots = Vec::new();
        slots.resize_with(total, Mutex::default);
        ReversePositionGraph { spans, slots }
    }

    /// Records that `parent` (a position in the solving tier) has the
    /// canonical child `child`.
    ///
    /// # Errors
    ///
    /// Fails if `child` lies outside the spanned tier group (a game contract
    /// violation surfaced by the caller) or its parent list cannot grow.
    pub fn insert(
        &self,
        child: TierPosition,
        parent: Position,
    ) -> Result<()> {
        let mut parents = lock(self.slot(child)?);
        parents
            .try_reserve(1)
            .map_err(|_| SolverError::OutOfMemory {
                what: "a reverse position graph parent list",
            })?;
        parents.push(parent);
        Ok(())
    }

    /// Removes and returns the parents recorded for `child`, freeing its
    /// slot. Each child is decided (and therefore queried) at most once per
    /// solve.
    pub fn take(&self, child: TierPosition) -> Result<Vec<Position>> {
        Ok(std::mem::take(&mut *lock(self.slot(child)?)))
    }

    fn slot(&self, child: TierPosition) -> Result<&Mutex<Vec<Position>>> {
        let &(offset, size) = self.spans.get(&child.tier).ok_or(
            SolverError::SolverViolation {
                hint: format!(
                    "Position {child} lies outside the solving tier group.",
                ),
            },
        )?;
        if child.position >= size {
            Err(SolverError::SolverViolation {
                hint: format!(
                    "Position {child} is out of bounds for its tier.",
                ),
            })?
        }
        Ok(&self.slots[offset + child.position as usize])
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::game::mock::SessionBuilder;
    use crate::solver::Value;

    #[test]
    fn reverse_tier_edges_deduplicate() {
        let mut graph = ReverseTierGraph::new();
        graph.add(1, 0);
        graph.add(1, 0);
        graph.add(1, 2);

        assert_eq!(graph.count(1), 2);
        assert_eq!(graph.pop(1), vec![0, 2]);
        assert_eq!(graph.count(1), 0);
    }

    #[test]
    fn position_parents_accumulate_and_drain() -> Result<()> {
        let game = SessionBuilder::new("span")
            .tier(0, 2)
            .tier(1, 3)
            .start(0, 0)
            .edge(0, 0, 1, 2)
            .edge(0, 1, 1, 2)
            .primitive(1, 2, Value::Lose)
            .build()?;

        let graph = ReversePositionGraph::new(&game, &[1, 0]);
        let child = TierPosition {
            tier: 1,
            position: 2,
        };
        graph.insert(child, 0)?;
        graph.insert(child, 1)?;

        assert_eq!(graph.take(child)?, vec![0, 1]);
        assert!(graph.take(child)?.is_empty());
        Ok(())
    }

    #[test]
    fn foreign_tiers_are_rejected() -> Result<()> {
        let game = SessionBuilder::new("foreign")
            .tier(0, 1)
            .start(0, 0)
            .primitive(0, 0, Value::Win)
            .build()?;

        let graph = ReversePositionGraph::new(&game, &[0]);
        let stranger = TierPosition {
            tier: 9,
            position: 0,
        };
        assert!(graph.insert(stranger, 0).is_err());
        Ok(())
    }
}
