//! # Tier Worker Module
//!
//! Solves a single tier by parallel backward induction, given a database in
//! which every canonical child tier of the target has already been solved.
//! Child outcomes are staged into per-remoteness frontiers, the tier's own
//! positions are scanned for primitives and child counts, and outcomes are
//! then propagated to parents stratum by stratum in strictly ascending
//! remoteness order. Positions never reached by propagation are draws.

use anyhow::{Context, Result};
use log::debug;
use rayon::prelude::*;

use std::sync::atomic::{AtomicI16, Ordering};

use crate::database::{TierDatabase, TierRecord};
use crate::game::error::GameError;
use crate::game::{util, Tier, TierGame, TierPosition};
use crate::game::Position;
use crate::solver::error::SolverError;
use crate::solver::frontier::Frontier;
use crate::solver::graph::ReversePositionGraph;
use crate::solver::{Outcome, Remoteness, Value, MAX_REMOTENESS};
use crate::util::chunk_ranges;

/* DEFINITIONS */

/// Distinguishes a tier whose record was computed by this worker from one
/// whose existing record was reused without solving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    Solved,
    Loaded,
}

/// The working state of one tier solve. All shared structures use interior
/// mutability gated on atomics, so the six solving steps can run their
/// position loops in parallel without locks around Game API calls.
struct Induction<'a, G: ?Sized, D: ?Sized> {
    game: &'a G,
    db: &'a D,
    tier: Tier,
    size: u64,
    chunk: u64,
    tiers: Vec<Tier>,
    graph: Option<ReversePositionGraph>,
    record: TierRecord,
    counters: Vec<AtomicI16>,
    lose: Frontier,
    win: Frontier,
    tie: Frontier,
}

/* WORKER ENTRY */

/// Solves `tier` against `db`, which must already contain records for every
/// canonical child tier. When `force` is false and a record for `tier`
/// already exists, it is reused and no solving happens.
///
/// # Errors
///
/// Fails on database I/O errors, game contract violations, remoteness
/// overflow, and frontier or reverse-graph allocation failure. In all cases
/// no record is stored for `tier`.
pub fn solve<G, D>(
    game: &G,
    db: &D,
    tier: Tier,
    force: bool,
) -> Result<WorkStatus>
where
    G: TierGame + ?Sized,
    D: TierDatabase + ?Sized,
{
    if !force && db.contains(tier)? {
        debug!("Reusing existing record for tier {tier}.");
        return Ok(WorkStatus::Loaded);
    }

    let induction = Induction::new(game, db, tier)?;
    induction.load_children()?;
    induction.scan()?;
    induction.propagate()?;
    induction.mark_draws()?;
    induction.persist()?;

    Ok(WorkStatus::Solved)
}

/// Compares the record stored for `tier` in `db` against the one in
/// `reference`, reporting the number of mismatched positions.
///
/// # Errors
///
/// Fails if either record is missing, their sizes differ, or any position's
/// stored outcome differs between the two.
pub fn verify<D, R>(db: &D, reference: &R, tier: Tier) -> Result<()>
where
    D: TierDatabase + ?Sized,
    R: TierDatabase + ?Sized,
{
    let ours = db.load(tier)?;
    let theirs = reference.load(tier)?;
    if ours.size() != theirs.size() {
        Err(SolverError::SolverViolation {
            hint: format!(
                "Tier {tier} has {} records, but the reference has {}.",
                ours.size(),
                theirs.size(),
            ),
        })?
    }

    let mut mismatched = 0u64;
    let mut first = None;
    for position in 0..ours.size() {
        let mine = ours.get(position)?;
        let other = theirs.get(position)?;
        if mine != other {
            mismatched += 1;
            first.get_or_insert((position, mine, other));
        }
    }

    if let Some((position, mine, other)) = first {
        Err(SolverError::SolverViolation {
            hint: format!(
                "Tier {tier} disagrees with the reference on {mismatched} \
                positions; first at {position} ({mine} vs. {other}).",
            ),
        })?
    }
    Ok(())
}

/* SOLVING STEPS */

impl<'a, G, D> Induction<'a, G, D>
where
    G: TierGame + ?Sized,
    D: TierDatabase + ?Sized,
{
    /// Step 0: gathers the canonical tier group and allocates the record
    /// array, undecided-children counters, and value-class frontiers.
    fn new(game: &'a G, db: &'a D, tier: Tier) -> Result<Self> {
        let (children, _) = util::canonical_child_tiers(game, tier);
        if children.contains(&tier) {
            Err(GameError::ContractViolation {
                hint: format!(
                    "Tier {tier} lists itself among its child tiers.",
                ),
            })?
        }

        let mut tiers = children;
        tiers.push(tier);

        let graph = if game.retrograde() {
            None
        } else {
            Some(ReversePositionGraph::new(game, &tiers))
        };

        let size = game.tier_size(tier);
        let mut counters = Vec::new();
        counters.resize_with(size as usize, || AtomicI16::new(0));

        let threads = rayon::current_num_threads();
        Ok(Induction {
            game,
            db,
            tier,
            size,
            chunk: game.chunk_size().max(1),
            tiers,
            graph,
            record: TierRecord::new(size),
            counters,
            lose: Frontier::new(threads),
            win: Frontier::new(threads),
            tie: Frontier::new(threads),
        })
    }

    /// Step 1: stages every decided position of every canonical child tier
    /// into the frontier of its value class. Child tiers are staged in the
    /// fixed group order so frontier dividers line up across threads.
    fn load_children(&self) -> Result<()> {
        for &child in &self.tiers[..self.tiers.len() - 1] {
            let record = self.db.load(child).with_context(|| {
                format!(
                    "Failed to load solved child tier {child} while solving \
                    tier {}.",
                    self.tier,
                )
            })?;

            chunk_ranges(record.size(), self.chunk)
                .into_par_iter()
                .try_for_each(|range| -> Result<()> {
                    for position in range {
                        let outcome = record.get(position)?;
                        match outcome.value {
                            Value::Lose => {
                                self.lose.add(outcome.remoteness, position)?
                            },
                            Value::Win => {
                                self.win.add(outcome.remoteness, position)?
                            },
                            Value::Tie => {
                                self.tie.add(outcome.remoteness, position)?
                            },
                            Value::Undecided | Value::Draw => (),
                        }
                    }
                    Ok(())
                })?;

            self.seal();
        }
        Ok(())
    }

    /// Step 3: scans the tier's own positions. Primitives are recorded at
    /// remoteness zero and staged for propagation; other legal canonical
    /// positions get their canonical child count, populating the reverse
    /// position graph along the way when one is in use.
    fn scan(&self) -> Result<()> {
        chunk_ranges(self.size, self.chunk)
            .into_par_iter()
            .try_for_each(|range| -> Result<()> {
                for position in range {
                    let state = TierPosition {
                        tier: self.tier,
                        position,
                    };
                    if !self.game.legal(state)
                        || self.game.canonical_position(state) != position
                    {
                        continue;
                    }
                    match self.game.primitive(state) {
                        Value::Undecided => self.count(state)?,
                        value @ (Value::Lose | Value::Tie | Value::Win) => {
                            self.record.set(
                                position,
                                Outcome {
                                    value,
                                    remoteness: 0,
                                },
                            )?;
                            self.class(value).add(0, position)?;
                        },
                        Value::Draw => Err(GameError::ContractViolation {
                            hint: format!(
                                "Position {state} is primitive with value \
                                draw, which no terminal position can hold.",
                            ),
                        })?,
                    }
                }
                Ok(())
            })?;

        self.seal();
        Ok(())
    }

    /// Step 4: propagates outcomes to parents stratum by stratum. Within
    /// one remoteness, losing children resolve parents to wins before
    /// winning children relax parent counters; tying children propagate
    /// only after every win/lose stratum is exhausted.
    fn propagate(&self) -> Result<()> {
        for r in 0..=MAX_REMOTENESS {
            if r > self.lose.peak() && r > self.win.peak() {
                break;
            }
            self.resolve(self.lose.take(r), r, Value::Win)?;
            self.relax(self.win.take(r), r)?;
        }

        for r in 0..=MAX_REMOTENESS {
            if r > self.tie.peak() {
                break;
            }
            self.resolve(self.tie.take(r), r, Value::Tie)?;
        }
        Ok(())
    }

    /// Step 5: every position whose counter still shows undecided children
    /// was never reached by a conclusive line of play, making it a draw.
    fn mark_draws(&self) -> Result<()> {
        chunk_ranges(self.size, self.chunk)
            .into_par_iter()
            .try_for_each(|range| -> Result<()> {
                for position in range {
                    if self.counters[position as usize].load(Ordering::Relaxed)
                        > 0
                    {
                        self.record.set(
                            position,
                            Outcome {
                                value: Value::Draw,
                                remoteness: 0,
                            },
                        )?;
                    }
                }
                Ok(())
            })
    }

    /// Step 6: flushes the finished record array.
    fn persist(&self) -> Result<()> {
        self.db
            .store(self.tier, &self.record)
            .with_context(|| {
                format!("Failed to persist record for tier {}.", self.tier)
            })?;
        debug!(
            "Solved tier {} ({} positions).",
            self.tier, self.size,
        );
        Ok(())
    }

    /* PROPAGATION PRIMITIVES */

    /// Counts the canonical children of non-primitive `state` into its
    /// counter slot, feeding the reverse position graph when in use.
    fn count(&self, state: TierPosition) -> Result<()> {
        let children = util::children(self.game, state);
        if children.is_empty() {
            Err(GameError::ContractViolation {
                hint: format!(
                    "Position {state} is legal and non-primitive but has no \
                    children.",
                ),
            })?
        }
        if children.len() > i16::MAX as usize {
            Err(GameError::ContractViolation {
                hint: format!(
                    "Position {state} has {} children, above the solver's \
                    counter capacity.",
                    children.len(),
                ),
            })?
        }

        if let Some(graph) = &self.graph {
            for &child in &children {
                graph.insert(child, state.position)?;
            }
        }

        self.counters[state.position as usize]
            .store(children.len() as i16, Ordering::Relaxed);
        Ok(())
    }

    /// Labels every undecided parent of the given child entries with
    /// `label` at the next remoteness stratum. The counter swap is the
    /// linearization point: whichever thread zeroes the counter first owns
    /// the position's record cell.
    fn resolve(
        &self,
        entries: Vec<(Position, usize)>,
        r: Remoteness,
        label: Value,
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        entries
            .par_chunks(self.chunk.max(1) as usize)
            .try_for_each(|batch| -> Result<()> {
                for &(position, origin) in batch {
                    for q in self.parents(position, origin)? {
                        self.bounded(q)?;
                        let counter = &self.counters[q as usize];
                        if counter.swap(0, Ordering::Relaxed) > 0 {
                            if r >= MAX_REMOTENESS {
                                Err(SolverError::RemotenessOverflow {
                                    tier: self.tier,
                                })?
                            }
                            self.record.set(
                                q,
                                Outcome {
                                    value: label,
                                    remoteness: r + 1,
                                },
                            )?;
                            self.class(label).add(r + 1, q)?;
                        }
                    }
                }
                Ok(())
            })
    }

    /// Decrements the undecided-children counter of every parent of the
    /// given winning child entries, refusing to go below zero. A counter
    /// reaching zero here means every child is winning for the opponent,
    /// so the parent loses at the next stratum.
    fn relax(
        &self,
        entries: Vec<(Position, usize)>,
        r: Remoteness,
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        entries
            .par_chunks(self.chunk.max(1) as usize)
            .try_for_each(|batch| -> Result<()> {
                for &(position, origin) in batch {
                    for q in self.parents(position, origin)? {
                        self.bounded(q)?;
                        let counter = &self.counters[q as usize];
                        let mut current = counter.load(Ordering::Relaxed);
                        let previous = loop {
                            if current <= 0 {
                                break current;
                            }
                            match counter.compare_exchange_weak(
                                current,
                                current - 1,
                                Ordering::Relaxed,
                                Ordering::Relaxed,
                            ) {
                                Ok(_) => break current,
                                Err(observed) => current = observed,
                            }
                        };

                        if previous == 1 {
                            if r >= MAX_REMOTENESS {
                                Err(SolverError::RemotenessOverflow {
                                    tier: self.tier,
                                })?
                            }
                            self.record.set(
                                q,
                                Outcome {
                                    value: Value::Lose,
                                    remoteness: r + 1,
                                },
                            )?;
                            self.lose.add(r + 1, q)?;
                        }
                    }
                }
                Ok(())
            })
    }

    /// Returns the canonical parents in the solving tier of a frontier
    /// entry, resolving its originating tier through the group order.
    fn parents(&self, position: Position, origin: usize) -> Result<Vec<Position>> {
        let tier = self.tiers[origin.min(self.tiers.len() - 1)];
        let child = TierPosition { tier, position };
        match &self.graph {
            Some(graph) => graph.take(child),
            None => Ok(self.game.parents(child, self.tier)),
        }
    }

    fn bounded(&self, parent: Position) -> Result<()> {
        if parent >= self.size {
            Err(GameError::ContractViolation {
                hint: format!(
                    "Parent position {parent} is out of bounds for tier {}.",
                    self.tier,
                ),
            })?
        }
        Ok(())
    }

    fn class(&self, value: Value) -> &Frontier {
        match value {
            Value::Lose => &self.lose,
            Value::Tie => &self.tie,
            _ => &self.win,
        }
    }

    fn seal(&self) {
        self.lose.seal();
        self.win.seal();
        self.tie.seal();
    }
}
