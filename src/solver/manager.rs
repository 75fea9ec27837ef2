//! # Tier Manager Module
//!
//! Discovers the directed acyclic graph of canonical tiers reachable from a
//! game's initial tier, then drives retrograde analysis over it: tiers whose
//! canonical children are all solved are handed to the dispatch layer, and
//! each completion unlocks the parents waiting on it. Also provides the
//! analysis traversal (initial tier towards the leaves) and sampled
//! consistency checks over game implementations.

use anyhow::{bail, Result};
use log::{info, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde_json::json;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::database::TierDatabase;
use crate::game::error::GameError;
use crate::game::{util, Tier, TierGame, TierKind, TierPosition};
use crate::interface::IOMode;
use crate::solver::dispatch::{Dispatcher, Job, JobOutcome};
use crate::solver::graph::ReverseTierGraph;
use crate::solver::worker::WorkStatus;
use crate::solver::{Remoteness, Value};

/* DEFINITIONS */

/// Everything discovery learns about one canonical tier.
#[derive(Debug)]
pub struct TierInfo {
    /// Number of position indices in the tier.
    pub size: u64,

    /// Memory footprint of solving this tier: its own size plus the sizes
    /// of the child tiers that must be resident at the same time.
    pub group_size: u64,

    /// Number of unique canonical child tiers; the solving readiness
    /// counter starts here.
    pub children: usize,

    /// Number of unique canonical parent tiers; the analysis readiness
    /// counter starts here.
    pub parents: usize,
}

/// The immutable result of tier discovery.
#[derive(Debug)]
pub struct Discovery {
    pub tiers: HashMap<Tier, TierInfo>,
    pub reverse: ReverseTierGraph,
    pub initial: Tier,
    pub skipped: u64,
    pub max_tier_size: u64,
    pub max_group_size: u64,
    pub total_positions: u64,
}

/// Counts reported at the end of a solving run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub solved: u64,
    pub loaded: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Aggregated statistics over every stored tier record of a solved game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Analysis {
    pub tiers: u64,
    pub total_positions: u64,
    pub canonical_positions: u64,
    pub wins: u64,
    pub loses: u64,
    pub ties: u64,
    pub draws: u64,
    pub max_remoteness: Remoteness,
    pub histogram: Vec<u64>,
}

enum Color {
    InProgress,
    Closed,
}

/* DISCOVERY */

/// Walks the canonical tier graph depth-first from the game's initial tier,
/// validating acyclicity and recording per-tier sizes, group sizes, and the
/// reverse dependency edges scheduling consumes.
///
/// # Errors
///
/// Fails with [`GameError::TierCycle`] if the declared tier graph contains
/// a cycle, and with [`GameError::ContractViolation`] if a tier lists
/// itself as its own child.
pub fn discover<G: TierGame + ?Sized>(game: &G) -> Result<Discovery> {
    let initial = game.canonical_tier(game.initial_tier());
    let mut reverse = ReverseTierGraph::new();
    let mut tiers = HashMap::new();
    let mut color = HashMap::new();
    let mut skipped = 0;
    let mut stack = vec![initial];
    while let Some(&tier) = stack.last() {
        match color.get(&tier) {
            Some(Color::Closed) => {
                stack.pop();
            },
            Some(Color::InProgress) => {
                color.insert(tier, Color::Closed);
                stack.pop();
            },
            None => {
                color.insert(tier, Color::InProgress);
                let (children, resolved) =
                    util::canonical_child_tiers(game, tier);
                skipped += resolved;
                for &child in &children {
                    if child == tier {
                        Err(GameError::ContractViolation {
                            hint: format!(
                                "Tier {tier} lists itself among its child \
                                tiers.",
                            ),
                        })?
                    }
                    match color.get(&child) {
                        Some(Color::InProgress) => {
                            Err(GameError::TierCycle { tier: child })?
                        },
                        Some(Color::Closed) => (),
                        None => stack.push(child),
                    }
                    reverse.add(child, tier);
                }

                let size = game.tier_size(tier);
                let group_size = size
                    + match game.tier_kind(tier) {
                        TierKind::ImmediateTransition => children
                            .iter()
                            .map(|&child| game.tier_size(child))
                            .max()
                            .unwrap_or(0),
                        TierKind::Loopy => children
                            .iter()
                            .map(|&child| game.tier_size(child))
                            .sum(),
                    };
                tiers.insert(
                    tier,
                    TierInfo {
                        size,
                        group_size,
                        children: children.len(),
                        parents: 0,
                    },
                );
            },
        }
    }

    let mut max_tier_size = 0;
    let mut max_group_size = 0;
    let mut total_positions = 0;
    for (&tier, info) in tiers.iter_mut() {
        info.parents = reverse.count(tier);
        max_tier_size = max_tier_size.max(info.size);
        max_group_size = max_group_size.max(info.group_size);
        total_positions += info.size;
    }

    info!(
        "Discovered {} canonical tiers holding {} positions (largest tier \
        {}, largest tier group {}).",
        tiers.len(),
        total_positions,
        max_tier_size,
        max_group_size,
    );

    Ok(Discovery {
        tiers,
        reverse,
        initial,
        skipped,
        max_tier_size,
        max_group_size,
        total_positions,
    })
}

/* SOLVING */

/// Solves every canonical tier of `game` into `db` in dependency order,
/// using `dispatcher` for tier-level concurrency. A failed tier leaves its
/// transitive dependents unsolved but does not stop independent work; the
/// game-solved marker is only written when nothing failed.
pub fn solve<G, D, P>(
    game: &G,
    db: &D,
    dispatcher: &mut P,
    mode: IOMode,
) -> Result<Summary>
where
    G: TierGame + ?Sized,
    D: TierDatabase + ?Sized,
    P: Dispatcher + ?Sized,
{
    let mut discovery = discover(game)?;
    let mut summary = Summary {
        skipped: discovery.skipped,
        ..Summary::default()
    };

    let mut remaining: HashMap<Tier, usize> = discovery
        .tiers
        .iter()
        .map(|(&tier, info)| (tier, info.children))
        .collect();

    let mut leaves: Vec<Tier> = remaining
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&tier, _)| tier)
        .collect();
    leaves.sort_unstable();
    let mut ready: VecDeque<Tier> = leaves.into();

    let mut in_flight = 0usize;
    loop {
        while in_flight < dispatcher.capacity() {
            let Some(tier) = ready.pop_front() else {
                break;
            };
            if game.canonical_tier(tier) != tier {
                summary.skipped += 1;
                continue;
            }
            dispatcher.submit(Job {
                tier,
                force: mode.force(),
            })?;
            in_flight += 1;
        }
        if in_flight == 0 {
            break;
        }

        let completion = dispatcher.collect()?;
        in_flight -= 1;
        match completion.outcome {
            JobOutcome::Finished(WorkStatus::Solved) => summary.solved += 1,
            JobOutcome::Finished(WorkStatus::Loaded) => summary.loaded += 1,
            JobOutcome::Failed(hint) => {
                summary.failed += 1;
                eprintln!("tier {}: {hint}", completion.tier);
                continue;
            },
        }

        for parent in discovery.reverse.pop(completion.tier) {
            if let Some(count) = remaining.get_mut(&parent) {
                *count -= 1;
                if *count == 0 {
                    ready.push_back(parent);
                }
            }
        }
    }

    dispatcher.shutdown()?;
    if summary.failed == 0 {
        db.mark_solved()?;
        info!("Game solved: {summary}.");
    } else {
        warn!("Game left unsolved: {summary}.");
    }
    Ok(summary)
}

/* ANALYSIS */

/// Aggregates the solved database of `game` into per-value totals and a
/// remoteness histogram, visiting tiers from the initial tier towards the
/// leaves (each tier is visited once all its canonical parents have been).
pub fn analyze<G, D>(game: &G, db: &D) -> Result<Analysis>
where
    G: TierGame + ?Sized,
    D: TierDatabase + ?Sized,
{
    if !db.is_solved()? {
        bail!("The game has no complete solution to analyze; solve it first.")
    }

    let discovery = discover(game)?;
    let mut remaining: HashMap<Tier, usize> = discovery
        .tiers
        .iter()
        .map(|(&tier, info)| (tier, info.parents))
        .collect();

    let mut analysis = Analysis::default();
    let mut ready = VecDeque::from([discovery.initial]);
    while let Some(tier) = ready.pop_front() {
        let record = db.load(tier)?;
        analysis.tiers += 1;
        analysis.total_positions += record.size();
        for position in 0..record.size() {
            let outcome = record.get(position)?;
            match outcome.value {
                Value::Undecided => continue,
                Value::Win => analysis.wins += 1,
                Value::Lose => analysis.loses += 1,
                Value::Tie => analysis.ties += 1,
                Value::Draw => analysis.draws += 1,
            }
            analysis.canonical_positions += 1;
            if outcome.value.concrete() {
                let r = outcome.remoteness;
                analysis.max_remoteness = analysis.max_remoteness.max(r);
                if analysis.histogram.len() <= r as usize {
                    analysis.histogram.resize(r as usize + 1, 0);
                }
                analysis.histogram[r as usize] += 1;
            }
        }

        let (children, _) = util::canonical_child_tiers(game, tier);
        for child in children {
            if let Some(count) = remaining.get_mut(&child) {
                *count -= 1;
                if *count == 0 {
                    ready.push_back(child);
                }
            }
        }
    }

    Ok(analysis)
}

/* CONSISTENCY CHECKS */

/// Verifies symmetry and transition contracts of `game` on a random sample
/// of `samples` positions per canonical tier: canonicalization must be
/// involutive, symmetric tier mappings must round-trip, canonical children
/// must be legal, and (for games enumerating parents) the parent and child
/// relations must be mutual.
pub fn check<G: TierGame + ?Sized>(game: &G, samples: u64) -> Result<()> {
    let discovery = discover(game)?;
    let mut rng = rand::thread_rng();
    for (&tier, info) in &discovery.tiers {
        if game.canonical_tier(tier) != tier {
            Err(GameError::ContractViolation {
                hint: format!(
                    "Canonical tier {tier} does not map to itself.",
                ),
            })?
        }

        for raw in game.child_tiers(tier) {
            let canonical = game.canonical_tier(raw);
            if game.canonical_tier(canonical) != canonical {
                Err(GameError::ContractViolation {
                    hint: format!(
                        "Tier canonicalization is not involutive at {raw}.",
                    ),
                })?
            }
            if canonical == raw {
                continue;
            }
            let size = game.tier_size(canonical);
            if size == 0 {
                continue;
            }
            for _ in 0..samples.min(size) {
                let position = rng.gen_range(0..size);
                let state = TierPosition {
                    tier: canonical,
                    position,
                };
                let there = TierPosition {
                    tier: raw,
                    position: game.symmetric_position(state, raw),
                };
                if game.symmetric_position(there, canonical) != position {
                    Err(GameError::ContractViolation {
                        hint: format!(
                            "Mapping {state} through symmetric tier {raw} \
                            does not return to it.",
                        ),
                    })?
                }
            }
        }

        if info.size == 0 {
            continue;
        }
        for _ in 0..samples {
            let position = rng.gen_range(0..info.size);
            let state = TierPosition { tier, position };
            if !game.legal(state) {
                continue;
            }

            let canonical = util::canonicalize(game, state);
            if util::canonicalize(game, canonical) != canonical {
                Err(GameError::ContractViolation {
                    hint: format!(
                        "Position canonicalization is not involutive at \
                        {state}.",
                    ),
                })?
            }

            if state != canonical
                || game.primitive(state) != Value::Undecided
            {
                continue;
            }
            for child in util::children(game, state) {
                if !game.legal(child) {
                    Err(GameError::ContractViolation {
                        hint: format!(
                            "Canonical child {child} of {state} is illegal.",
                        ),
                    })?
                }
                if game.retrograde()
                    && !game.parents(child, tier).contains(&position)
                {
                    Err(GameError::ContractViolation {
                        hint: format!(
                            "Position {state} is missing from the parents \
                            of its child {child}.",
                        ),
                    })?
                }
            }
        }
    }
    Ok(())
}

/* POSITION SAMPLING */

/// Returns a uniformly-flavored random legal position of `game`: a tier is
/// drawn with probability proportional to its size, then position indices
/// are drawn until one is legal.
pub fn random_position<G: TierGame + ?Sized>(
    game: &G,
) -> Result<TierPosition> {
    let discovery = discover(game)?;
    let tiers: Vec<(Tier, u64)> = discovery
        .tiers
        .iter()
        .filter(|(_, info)| info.size > 0)
        .map(|(&tier, info)| (tier, info.size))
        .collect();
    if tiers.is_empty() {
        bail!("The game has no positions to sample.")
    }

    let weights = WeightedIndex::new(
        tiers.iter().map(|&(_, size)| size),
    )?;
    let mut rng = rand::thread_rng();
    for _ in 0..100_000 {
        let (tier, size) = tiers[weights.sample(&mut rng)];
        let state = TierPosition {
            tier,
            position: rng.gen_range(0..size),
        };
        if game.legal(state) {
            return Ok(state);
        }
    }
    bail!("Failed to sample a legal position; the game may have none.")
}

/* AUXILIARY IMPLEMENTATIONS */

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiers solved, {} loaded, {} skipped, {} failed",
            self.solved, self.loaded, self.skipped, self.failed,
        )
    }
}

impl Analysis {
    /// Returns this analysis as a JSON document.
    pub fn json(&self) -> serde_json::Value {
        json!({
            "tiers": self.tiers,
            "positions": {
                "total": self.total_positions,
                "canonical": self.canonical_positions,
            },
            "values": {
                "win": self.wins,
                "lose": self.loses,
                "tie": self.ties,
                "draw": self.draws,
            },
            "remoteness": {
                "max": self.max_remoteness,
                "histogram": self.histogram,
            },
        })
    }
}
