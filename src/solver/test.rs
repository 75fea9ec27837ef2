//! # Solver Integration Test Module
//!
//! End-to-end scenarios exercising the manager, workers, dispatchers, and
//! databases together: declared mock games covering degenerate shapes, the
//! bundled games solved against known results, and the solution laws every
//! solved database must satisfy.

use anyhow::Result;
use tempfile::TempDir;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::database::{vector, volatile, TierDatabase};
use crate::game::error::GameError;
use crate::game::mock::SessionBuilder;
use crate::game::{mnk, util, zero_by};
use crate::game::{Codec, TierGame, TierPosition, Tiered};
use crate::interface::IOMode;
use crate::solver::dispatch::pool::PoolDispatcher;
use crate::solver::dispatch::remote::{
    channel_network, worker_loop, RemoteDispatcher,
};
use crate::solver::manager::{self, Summary};
use crate::solver::{worker, Outcome, Value};

/* HARNESS */

fn solve_into<G>(game: &Arc<G>) -> Result<(Arc<volatile::Database>, Summary)>
where
    G: TierGame + 'static,
{
    let db = Arc::new(volatile::Database::new());
    let mut dispatcher = PoolDispatcher::new(game.clone(), db.clone(), 2);
    let summary =
        manager::solve(&**game, &*db, &mut dispatcher, IOMode::Constructive)?;
    Ok((db, summary))
}

fn outcome(value: Value, remoteness: u16) -> Outcome {
    Outcome { value, remoteness }
}

/// Checks that every legal canonical position of a solved game is a fixed
/// point of the backward-induction equations relating it to its children.
fn assert_bellman<G, D>(game: &G, db: &D) -> Result<()>
where
    G: TierGame + ?Sized,
    D: TierDatabase + ?Sized,
{
    let discovery = manager::discover(game)?;
    for (&tier, info) in &discovery.tiers {
        for position in 0..info.size {
            let state = TierPosition { tier, position };
            if !game.legal(state)
                || game.canonical_position(state) != position
            {
                continue;
            }

            let here = db.probe(state)?;
            if game.primitive(state) != Value::Undecided {
                assert_eq!(here.value, game.primitive(state));
                assert_eq!(here.remoteness, 0);
                continue;
            }

            let mut children = Vec::new();
            for child in util::children(game, state) {
                children.push(db.probe(child)?);
            }
            let class_min = |value: Value| {
                children
                    .iter()
                    .filter(|o| o.value == value)
                    .map(|o| o.remoteness)
                    .min()
            };

            match here.value {
                Value::Win => {
                    assert_eq!(
                        class_min(Value::Lose),
                        Some(here.remoteness - 1),
                        "win at {state} is not against a fastest loss",
                    );
                },
                Value::Lose => {
                    let slowest = children
                        .iter()
                        .map(|o| o.remoteness)
                        .max();
                    assert!(
                        children.iter().all(|o| o.value == Value::Win),
                        "loss at {state} has an escape",
                    );
                    assert_eq!(Some(here.remoteness - 1), slowest);
                },
                Value::Tie => {
                    assert!(class_min(Value::Lose).is_none());
                    assert_eq!(
                        class_min(Value::Tie),
                        Some(here.remoteness - 1),
                    );
                },
                Value::Draw => {
                    assert!(class_min(Value::Lose).is_none());
                    assert!(
                        children
                            .iter()
                            .any(|o| o.value == Value::Draw),
                        "draw at {state} has no drawing move",
                    );
                },
                Value::Undecided => {
                    panic!("legal canonical {state} left undecided")
                },
            }
        }
    }
    Ok(())
}

/* MOCK SCENARIOS */

#[test]
fn primitive_only_tier_needs_no_propagation() -> Result<()> {
    let mut builder = SessionBuilder::new("all-wins")
        .tier(0, 5)
        .start(0, 0);
    for position in 0..5 {
        builder = builder.primitive(0, position, Value::Win);
    }
    let game = Arc::new(builder.build()?);

    let (db, summary) = solve_into(&game)?;
    assert_eq!(summary.solved, 1);
    assert_eq!(summary.failed, 0);
    for position in 0..5 {
        let state = TierPosition { tier: 0, position };
        assert_eq!(db.probe(state)?, outcome(Value::Win, 0));
    }
    Ok(())
}

#[test]
fn two_tier_dependency_propagates_wins() -> Result<()> {
    for retrograde in [false, true] {
        let mut builder = SessionBuilder::new("ladder")
            .tier(0, 10)
            .tier(1, 10)
            .start(1, 0);
        for position in 0..10 {
            builder = builder
                .primitive(0, position, Value::Lose)
                .edge(1, position, 0, position);
        }
        if retrograde {
            builder = builder.retrograde();
        }
        let game = Arc::new(builder.build()?);

        let (db, summary) = solve_into(&game)?;
        assert_eq!(summary.solved, 2);
        for position in 0..10 {
            let bottom = TierPosition { tier: 0, position };
            let top = TierPosition { tier: 1, position };
            assert_eq!(db.probe(bottom)?, outcome(Value::Lose, 0));
            assert_eq!(db.probe(top)?, outcome(Value::Win, 1));
        }
        assert_bellman(&*game, &*db)?;
    }
    Ok(())
}

#[test]
fn pure_cycles_resolve_to_draws() -> Result<()> {
    let mut builder = SessionBuilder::new("carousel")
        .tier(0, 4)
        .start(0, 0);
    for position in 0..4 {
        builder = builder.edge(0, position, 0, (position + 1) % 4);
    }
    let game = Arc::new(builder.build()?);

    let (db, summary) = solve_into(&game)?;
    assert_eq!(summary.solved, 1);
    for position in 0..4 {
        let state = TierPosition { tier: 0, position };
        assert_eq!(db.probe(state)?, outcome(Value::Draw, 0));
    }
    assert_bellman(&*game, &*db)?;
    Ok(())
}

#[test]
fn declared_tier_cycles_fail_discovery() -> Result<()> {
    let game = Arc::new(
        SessionBuilder::new("ouroboros")
            .tier(0, 1)
            .tier(1, 1)
            .link(0, 1)
            .link(1, 0)
            .start(0, 0)
            .build()?,
    );

    let failure = manager::discover(&*game).unwrap_err();
    assert!(matches!(
        failure.downcast_ref::<GameError>(),
        Some(GameError::TierCycle { .. }),
    ));

    let db = Arc::new(volatile::Database::new());
    let mut dispatcher = PoolDispatcher::new(game.clone(), db.clone(), 1);
    assert!(manager::solve(
        &*game,
        &*db,
        &mut dispatcher,
        IOMode::Constructive,
    )
    .is_err());
    assert!(!db.is_solved()?);
    Ok(())
}

#[test]
fn childless_medial_positions_fail_their_tier() -> Result<()> {
    let game = Arc::new(
        SessionBuilder::new("stuck")
            .tier(0, 1)
            .start(0, 0)
            .build()?,
    );

    let (db, summary) = solve_into(&game)?;
    assert_eq!(summary.solved, 0);
    assert_eq!(summary.failed, 1);
    assert!(!db.is_solved()?);
    assert!(!db.contains(0)?);
    Ok(())
}

#[test]
fn remoteness_overflow_fails_the_offending_tier() -> Result<()> {
    let span = 1100u64;
    let mut builder = SessionBuilder::new("abyss")
        .start(span - 1, 0)
        .primitive(0, 0, Value::Lose);
    for tier in 0..span {
        builder = builder.tier(tier, 1);
        if tier > 0 {
            builder = builder.edge(tier, 0, tier - 1, 0);
        }
    }
    let game = Arc::new(builder.build()?);

    let (db, summary) = solve_into(&game)?;
    assert_eq!(summary.solved, 1024);
    assert_eq!(summary.failed, 1);
    assert!(!db.is_solved()?);

    let deepest = TierPosition {
        tier: 1023,
        position: 0,
    };
    assert_eq!(db.probe(deepest)?, outcome(Value::Win, 1023));
    assert!(!db.contains(1024)?);
    Ok(())
}

#[test]
fn symmetric_twin_tiers_collapse_onto_canonical() -> Result<()> {
    let game = Arc::new(
        SessionBuilder::new("mirror")
            .tier(0, 2)
            .tier(1, 2)
            .tier(2, 2)
            .twin(2, 1)
            .start(0, 0)
            .primitive(1, 0, Value::Lose)
            .primitive(1, 1, Value::Win)
            .edge(0, 0, 2, 0)
            .edge(0, 1, 2, 1)
            .build()?,
    );

    manager::check(&*game, 8)?;
    let (db, summary) = solve_into(&game)?;
    assert_eq!(summary.solved, 2);
    assert_eq!(summary.skipped, 1);
    assert!(!db.contains(2)?);

    let free = TierPosition {
        tier: 0,
        position: 0,
    };
    let bound = TierPosition {
        tier: 0,
        position: 1,
    };
    assert_eq!(db.probe(free)?, outcome(Value::Win, 1));
    assert_eq!(db.probe(bound)?, outcome(Value::Lose, 1));
    Ok(())
}

#[test]
fn every_rank_shares_the_tier_load() -> Result<()> {
    let workers = 4usize;
    let leaves = 100u64;
    let mut builder = SessionBuilder::new("meadow")
        .tier(0, 1)
        .start(0, 0)
        .primitive(0, 0, Value::Win);
    for tier in 1..=leaves {
        builder = builder.tier(tier, 256).link(0, tier);
        for position in 0..256 {
            builder = builder.primitive(tier, position, Value::Win);
        }
    }
    let game = Arc::new(builder.build()?);
    let db = Arc::new(volatile::Database::new());

    let (hub, endpoints) = channel_network(workers);
    let gate = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for endpoint in endpoints {
        let game = game.clone();
        let db = db.clone();
        let gate = gate.clone();
        handles.push(thread::spawn(move || {
            gate.wait();
            worker_loop(
                &*game,
                &*db,
                &endpoint,
                Duration::from_millis(1),
            )
        }));
    }

    let mut dispatcher = RemoteDispatcher::new(hub);
    let summary = manager::solve(
        &*game,
        &*db,
        &mut dispatcher,
        IOMode::Constructive,
    )?;
    for handle in handles {
        handle
            .join()
            .expect("worker rank panicked")?;
    }

    assert_eq!(summary.solved, leaves + 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        dispatcher.tallies().iter().sum::<u64>(),
        leaves + 1,
    );
    assert!(
        dispatcher
            .tallies()
            .iter()
            .all(|&count| count > 0),
        "a worker rank starved: {:?}",
        dispatcher.tallies(),
    );
    Ok(())
}

/* BUNDLED GAME SCENARIOS */

#[test]
fn tic_tac_toe_solves_to_a_tie() -> Result<()> {
    let game = Arc::new(mnk::Session::new(None)?);
    let (db, summary) = solve_into(&game)?;
    assert_eq!(summary.solved, 10);
    assert_eq!(summary.failed, 0);
    assert!(db.is_solved()?);

    let start = util::canonicalize(&*game, game.initial_position());
    assert_eq!(db.probe(start)?, outcome(Value::Tie, 9));

    let finished = game.decode("xxxoo----".into())?;
    let finished = util::canonicalize(&*game, finished);
    assert_eq!(db.probe(finished)?, outcome(Value::Lose, 0));

    let analysis = manager::analyze(&*game, &*db)?;
    assert_eq!(analysis.canonical_positions, 765);
    assert_eq!(analysis.tiers, 10);
    assert_eq!(analysis.draws, 0);
    assert_eq!(analysis.max_remoteness, 9);

    manager::check(&*game, 32)?;
    assert_bellman(&*game, &*db)?;
    Ok(())
}

#[test]
fn zero_by_solves_in_threes() -> Result<()> {
    let game = Arc::new(zero_by::Session::new(None)?);
    let (db, summary) = solve_into(&game)?;
    assert_eq!(summary.solved, 11);
    assert!(db.is_solved()?);

    let expectations = [
        (0, Value::Lose, 0),
        (3, Value::Lose, 2),
        (6, Value::Lose, 4),
        (9, Value::Lose, 6),
        (10, Value::Win, 7),
    ];
    for (tier, value, remoteness) in expectations {
        for position in 0..2 {
            let state = TierPosition { tier, position };
            assert_eq!(db.probe(state)?, outcome(value, remoteness));
        }
    }

    manager::check(&*game, 2)?;
    assert_bellman(&*game, &*db)?;
    Ok(())
}

/* PERSISTENCE LAWS */

#[test]
fn persistent_solutions_survive_and_repeat() -> Result<()> {
    let scratch = TempDir::new()?;
    let game = Arc::new(zero_by::Session::new(None)?);
    let db = Arc::new(vector::Database::new(
        scratch.path(),
        game.chunk_size(),
    )?);

    let mut dispatcher = PoolDispatcher::new(game.clone(), db.clone(), 2);
    let first = manager::solve(
        &*game,
        &*db,
        &mut dispatcher,
        IOMode::Constructive,
    )?;
    assert_eq!(first.solved, 11);
    assert!(db.is_solved()?);

    let start = TierPosition {
        tier: 10,
        position: 0,
    };
    assert_eq!(db.probe(start)?, outcome(Value::Win, 7));

    fn fingerprint(directory: &Path) -> Result<HashMap<PathBuf, Vec<u8>>> {
        let mut files = HashMap::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            files.insert(path.clone(), std::fs::read(path)?);
        }
        Ok(files)
    }
    let before = fingerprint(scratch.path())?;

    let mut dispatcher = PoolDispatcher::new(game.clone(), db.clone(), 2);
    let again = manager::solve(
        &*game,
        &*db,
        &mut dispatcher,
        IOMode::Constructive,
    )?;
    assert_eq!(again.solved, 0);
    assert_eq!(again.loaded, 11);

    let mut dispatcher = PoolDispatcher::new(game.clone(), db.clone(), 2);
    let forced = manager::solve(
        &*game,
        &*db,
        &mut dispatcher,
        IOMode::Overwrite,
    )?;
    assert_eq!(forced.solved, 11);
    assert_eq!(before, fingerprint(scratch.path())?);

    let (reference, _) = solve_into(&game)?;
    for tier in 0..=10 {
        worker::verify(&*db, &*reference, tier)?;
    }
    Ok(())
}
