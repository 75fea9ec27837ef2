#![forbid(unsafe_code)]
//! # Execution Module
//!
//! The module which aggregates the library modules of this crate to provide
//! an entry point to all the functionality of the project.
//!
//! Instead of this project's modules having an emphasized many-to-many
//! relationship, greater weight is placed on making things fit into this
//! module as a centralized point.

use anyhow::{bail, Result};
use clap::Parser;
use log::warn;

use std::path::Path;
use std::process;
use std::sync::Arc;

use crate::database::vector;
use crate::database::TierDatabase;
use crate::game::{mnk, zero_by};
use crate::game::{GameModule, Information, TierGame};
use crate::interface::terminal::cli::*;
use crate::interface::IOMode;
use crate::solver::dispatch::pool::PoolDispatcher;
use crate::solver::manager;

/* MODULES */

mod database;
mod game;
mod interface;
mod solver;
mod util;

/* PROGRAM ENTRY */

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .init();

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(util::thread_count())
        .build_global()
    {
        warn!("Failed to configure the thread pool: {e}");
    }

    let ret = match &cli.command {
        Commands::Solve(args) => solve(args, cli.quiet),
        Commands::Analyze(args) => analyze(args),
        Commands::Query(args) => query(args),
        Commands::GetStart(args) => getstart(args),
        Commands::GetRandom(args) => getrandom(args),
    };
    if let Err(e) = ret {
        if !cli.quiet {
            eprintln!("{e:#}");
        }
        process::exit(exitcode::SOFTWARE)
    }
    process::exit(exitcode::OK)
}

/* SUBCOMMAND EXECUTORS */

fn solve(args: &SolveArgs, quiet: bool) -> Result<()> {
    match args.target {
        GameModule::ZeroBy => solve_session(
            zero_by::Session::new(args.variant.clone())?,
            args,
            quiet,
        ),
        GameModule::Mnk => {
            solve_session(mnk::Session::new(args.variant.clone())?, args, quiet)
        },
    }
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    match args.target {
        GameModule::ZeroBy => {
            analyze_session(zero_by::Session::new(args.variant.clone())?, args)
        },
        GameModule::Mnk => {
            analyze_session(mnk::Session::new(args.variant.clone())?, args)
        },
    }
}

fn query(args: &QueryArgs) -> Result<()> {
    match args.target {
        GameModule::ZeroBy => query_session(
            zero_by::Session::new(Some(args.variant.clone()))?,
            args,
        ),
        GameModule::Mnk => query_session(
            mnk::Session::new(Some(args.variant.clone()))?,
            args,
        ),
    }
}

fn getstart(args: &GetStartArgs) -> Result<()> {
    match args.target {
        GameModule::ZeroBy => {
            start_session(zero_by::Session::new(args.variant.clone())?, args)
        },
        GameModule::Mnk => {
            start_session(mnk::Session::new(args.variant.clone())?, args)
        },
    }
}

fn getrandom(args: &GetRandomArgs) -> Result<()> {
    match args.target {
        GameModule::ZeroBy => {
            random_session(zero_by::Session::new(args.variant.clone())?, args)
        },
        GameModule::Mnk => {
            random_session(mnk::Session::new(args.variant.clone())?, args)
        },
    }
}

/* GENERIC SESSION DRIVERS */

fn solve_session<G>(game: G, args: &SolveArgs, quiet: bool) -> Result<()>
where
    G: TierGame + Information + 'static,
{
    let db = open_database::<G>(
        &args.data_path,
        args.variant.as_deref(),
        game.chunk_size(),
    )?;

    let game = Arc::new(game);
    let db = Arc::new(db);
    let mut dispatcher =
        PoolDispatcher::new(game.clone(), db.clone(), util::thread_count());

    let mode = IOMode::from(args.force);
    let summary = manager::solve(&*game, &*db, &mut dispatcher, mode)?;
    if summary.failed > 0 {
        bail!("{summary}")
    }
    if !quiet {
        util::emit(args.output.as_deref(), &summary.to_string())?;
    }
    Ok(())
}

fn analyze_session<G>(game: G, args: &AnalyzeArgs) -> Result<()>
where
    G: TierGame + Information,
{
    let db = open_database::<G>(
        &args.data_path,
        args.variant.as_deref(),
        game.chunk_size(),
    )?;

    let analysis = manager::analyze(&game, &db)?;
    let report = serde_json::to_string_pretty(&analysis.json())?;
    util::emit(args.output.as_deref(), &report)
}

fn query_session<G>(game: G, args: &QueryArgs) -> Result<()>
where
    G: TierGame + Information,
{
    let db = open_database::<G>(
        &args.data_path,
        Some(&args.variant),
        game.chunk_size(),
    )?;

    let info = G::info();
    let protocol = regex::Regex::new(info.state.pattern)?;
    if !protocol.is_match(&args.position) {
        bail!(
            "Position '{}' does not match the {} state pattern '{}'. \
            {}",
            args.position,
            info.name,
            info.state.pattern,
            info.state.explanation,
        )
    }

    let state = game.decode(args.position.clone())?;
    let outcome = db.probe(game::util::canonicalize(&game, state))?;
    util::emit(args.output.as_deref(), &outcome.to_string())
}

fn start_session<G>(game: G, args: &GetStartArgs) -> Result<()>
where
    G: TierGame + Information,
{
    let start = game.encode(game.initial_position())?;
    util::emit(args.output.as_deref(), &start)
}

fn random_session<G>(game: G, args: &GetRandomArgs) -> Result<()>
where
    G: TierGame + Information,
{
    let state = manager::random_position(&game)?;
    util::emit(args.output.as_deref(), &game.encode(state)?)
}

/* DATABASE PLUMBING */

fn open_database<G: Information>(
    data_path: &Path,
    variant: Option<&str>,
    chunk: u64,
) -> Result<vector::Database> {
    let info = G::info();
    let variant = variant.unwrap_or(info.variant.default);
    vector::Database::new(&data_path.join(info.name).join(variant), chunk)
}
