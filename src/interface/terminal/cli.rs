//! # Command Line Module
//!
//! This module offers UNIX-like CLI tooling in order to facilitate
//! scripting and ergonomic use of the solver. This uses the
//! [clap](https://docs.rs/clap/latest/clap/) crate to provide standard
//! behavior, which is outlined in [this](https://clig.dev/) great guide.

use clap::{Args, Parser, Subcommand};

use std::path::PathBuf;

use crate::game::GameModule;

/* COMMAND LINE INTERFACE */

/// Strata is a project for solving finite-state, deterministic, abstract
/// strategy games through retrograde analysis over tier partitions. In
/// addition to exhaustively solving implemented games, it can analyze their
/// solution sets and persist them efficiently for later queries.
#[derive(Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /* REQUIRED COMMANDS */
    /// Available subcommands for the main 'strata' command.
    #[command(subcommand)]
    pub command: Commands,

    /* DEFAULTS PROVIDED */
    /// Send no output to STDOUT during successful execution.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Raise logging verbosity to include diagnostics.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Subcommand choices, specified as `strata <subcommand>`.
#[derive(Subcommand)]
pub enum Commands {
    /// Solve a game's entire tier graph.
    Solve(SolveArgs),

    /// Analyze a game's existing solution set.
    Analyze(AnalyzeArgs),

    /// Look up the solved outcome of one position.
    Query(QueryArgs),

    /// Print a game's starting position.
    #[command(name = "getstart")]
    GetStart(GetStartArgs),

    /// Print a random legal position of a game.
    #[command(name = "getrandom")]
    GetRandom(GetRandomArgs),
}

/* ARGUMENT AND OPTION DEFINITIONS */

/// Ensures a specific game variant's solution set exists. Default behavior:
///
/// - Uses the target's default variant (see `variant` argument).
/// - Reuses existing tier records, computing only what is missing; the
///   `--force` flag recomputes everything from scratch.
/// - Persists records under the `--data-path` directory.
#[derive(Args)]
pub struct SolveArgs {
    /* REQUIRED ARGUMENTS */
    /// Target game name.
    pub target: GameModule,

    /* DEFAULTS PROVIDED */
    /// Solve a specific variant of target.
    pub variant: Option<String>,

    /// Directory under which solution sets are persisted.
    #[arg(long, default_value = "./data")]
    pub data_path: PathBuf,

    /// Write run summary to a file instead of STDOUT.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Re-solve everything, overwriting existing tier records.
    #[arg(short, long)]
    pub force: bool,
}

/// Aggregates a previously solved game's records into per-value totals and
/// a remoteness histogram, reported as JSON. Fails if no complete solution
/// set exists under the data path.
#[derive(Args)]
pub struct AnalyzeArgs {
    /* REQUIRED ARGUMENTS */
    /// Target game name.
    pub target: GameModule,

    /* DEFAULTS PROVIDED */
    /// Analyze a specific variant of target.
    pub variant: Option<String>,

    /// Directory under which solution sets are persisted.
    #[arg(long, default_value = "./data")]
    pub data_path: PathBuf,

    /// Write the JSON report to a file instead of STDOUT.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Looks up the value and remoteness solved for a single position, given in
/// the game's string protocol. The position is resolved to its canonical
/// form first, so any legal position of the variant can be queried.
#[derive(Args)]
pub struct QueryArgs {
    /* REQUIRED ARGUMENTS */
    /// Target game name.
    pub target: GameModule,

    /// Variant the position belongs to.
    pub variant: String,

    /// Position encoding, per the game's state protocol.
    pub position: String,

    /* DEFAULTS PROVIDED */
    /// Directory under which solution sets are persisted.
    #[arg(long, default_value = "./data")]
    pub data_path: PathBuf,

    /// Write the outcome to a file instead of STDOUT.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Prints the starting position of a game variant in the game's string
/// protocol.
#[derive(Args)]
pub struct GetStartArgs {
    /* REQUIRED ARGUMENTS */
    /// Target game name.
    pub target: GameModule,

    /* DEFAULTS PROVIDED */
    /// Use a specific variant of target.
    pub variant: Option<String>,

    /// Write the position to a file instead of STDOUT.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Prints a uniformly sampled legal position of a game variant in the
/// game's string protocol.
#[derive(Args)]
pub struct GetRandomArgs {
    /* REQUIRED ARGUMENTS */
    /// Target game name.
    pub target: GameModule,

    /* DEFAULTS PROVIDED */
    /// Use a specific variant of target.
    pub variant: Option<String>,

    /// Write the position to a file instead of STDOUT.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
