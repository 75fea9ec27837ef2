//! # Game Module
//!
//! Contains definitions and interfaces that support sequential games whose
//! state space is partitioned into tiers. A tier groups positions so that
//! making a move never increases the solving order: tiers form a directed
//! acyclic graph under the "has a child position in" relation, which lets a
//! solver finish entire tiers bottom-up. Special attention is paid to
//! supporting families of closely related games (variants) and symmetry
//! reductions on both positions and tiers.

use anyhow::Result;
use clap::ValueEnum;

use std::fmt;

use crate::solver::Value;

/* UTILITY MODULES */

pub mod util;
pub mod error;

/* GAME MODULES */

#[cfg(test)]
pub mod mock;

pub mod zero_by;
pub mod mnk;

/* TYPES */

/// Opaque identifier of a partition cell of a game's position space. Moves
/// made from positions inside one tier always land in a different tier, with
/// the exception of loopy tiers (see [`TierKind`]).
pub type Tier = u64;

/// Identifier of a position within some tier. Only unique when paired with
/// its tier; see [`TierPosition`].
pub type Position = u64;

/// String encoding some specific game's variant.
pub type Variant = String;

/// Globally unique identifier of a game position; the pairing of a tier with
/// a position index inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TierPosition {
    pub tier: Tier,
    pub position: Position,
}

/// Classifies the transition structure of a single tier, used as a solver
/// hint. Every legal move made from an immediate-transition tier lands in a
/// child tier; moves made from a loopy tier may stay within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierKind {
    ImmediateTransition,
    Loopy,
}

/// The default number of positions per database chunk, used when a game does
/// not declare a preference through [`Tiered::chunk_size`].
pub const DEFAULT_CHUNK_SIZE: u64 = 4096;

/* DEFINITIONS */

/// Specifies the game offerings available through all interfaces.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum GameModule {
    /// Abstract game played over sets of items.
    ZeroBy,

    /// Generalized version of Tic-Tac-Toe.
    Mnk,
}

/// Static description of a game family: what it is, who wrote it, and the
/// two string protocols its sessions speak (one selecting a variant, one
/// spelling positions).
///
/// Everything here is known at compile time and identical across sessions
/// of the family. Interfaces lean on it to route command-line targets, to
/// fill in defaults when the user names no variant or position, and to
/// reject malformed encodings before a game ever sees them.
pub struct GameData {
    /// Identifier accepted wherever the command line takes a game target.
    pub name: &'static str,

    /// Contact line for whoever implemented the game.
    pub authors: &'static str,

    /// Prose rundown of the rules and anything noteworthy about them.
    pub about: &'static str,

    /// How variant strings select a member of the family.
    pub variant: StringProtocol,

    /// How position strings are written and parsed.
    pub state: StringProtocol,
}

/// One of a game family's string encodings, described well enough for a
/// user to write one and for an interface to pre-validate it.
pub struct StringProtocol {
    /// Free-form guidance on composing an encoding, surfaced alongside
    /// rejections of malformed input.
    pub explanation: &'static str,

    /// Regular expression every encoding must match.
    pub pattern: &'static str,

    /// Encoding assumed when the user supplies none.
    pub default: &'static str,
}

/* INTERFACES */

pub trait Information {
    /// Returns the family-wide description of this game. See [`GameData`].
    fn info() -> GameData;
}

/// Describes a game's tier partition. Implementations promise that the graph
/// induced on tiers by [`Tiered::child_tiers`] is acyclic once tiers are
/// resolved to their canonical forms, and that every position reachable from
/// the initial position lies in some discovered tier.
pub trait Tiered {
    /// Returns the tier containing the game's starting position.
    fn initial_tier(&self) -> Tier;

    /// Returns the game's starting position.
    fn initial_position(&self) -> TierPosition;

    /// Returns the number of position indices in `tier`, including indices
    /// that do not correspond to legal positions.
    fn tier_size(&self, tier: Tier) -> u64;

    /// Returns the tiers containing children of positions in `tier`. The
    /// returned collection may contain duplicates and non-canonical tiers;
    /// callers are expected to resolve both. The solving tier itself should
    /// never appear (intra-tier moves are expressed by [`TierKind::Loopy`]).
    fn child_tiers(&self, tier: Tier) -> Vec<Tier>;

    /// Returns the transition structure of `tier`. The conservative default
    /// is [`TierKind::Loopy`], which is always correct.
    fn tier_kind(&self, tier: Tier) -> TierKind {
        let _ = tier;
        TierKind::Loopy
    }

    /// Returns the number of positions that should share one compressed
    /// database chunk, so parallel workers never decompress the same block.
    fn chunk_size(&self) -> u64 {
        DEFAULT_CHUNK_SIZE
    }
}

/// Describes a game's symmetry reductions. For each equivalence class of
/// tiers and of positions, a designated representative (the "canonical"
/// form) is the only member solved and persisted; the rest resolve to their
/// canonical twin through these methods. Mapping twice must be an identity,
/// and a position's canonical form must live in its tier's canonical form.
pub trait Symmetric {
    /// Returns the canonical representative of the symmetry class of `tier`.
    fn canonical_tier(&self, tier: Tier) -> Tier {
        tier
    }

    /// Returns the canonical representative of the symmetry class of `state`
    /// within its own tier.
    fn canonical_position(&self, state: TierPosition) -> Position {
        state.position
    }

    /// Maps `state` to its corresponding position within `other`, a tier
    /// symmetric to the one containing `state`.
    fn symmetric_position(&self, state: TierPosition, other: Tier) -> Position {
        let _ = other;
        state.position
    }
}

/// Describes a game's move structure as an implicit directed graph over
/// [`TierPosition`] nodes, along with the conditions that decide games.
pub trait Implicit {
    /// Returns true iff `state` corresponds to a legal position. Position
    /// indices inside a tier that decode to no reachable arrangement of the
    /// game are illegal and skipped by solvers.
    fn legal(&self, state: TierPosition) -> bool;

    /// Returns the value of `state` if it is decided without further moves,
    /// or [`Value::Undecided`] if play continues from it. Legal positions
    /// with no outcome and no moves constitute a broken game implementation.
    fn primitive(&self, state: TierPosition) -> Value;

    /// Returns the collection of positions reachable from `state` in one
    /// move. Results may repeat and need not be canonical; see
    /// [`util::children`] for the resolved form solvers consume.
    fn adjacent(&self, state: TierPosition) -> Vec<TierPosition>;

    /// Returns true iff this game implements [`Implicit::parents`]. Games
    /// which do not are solved through an on-the-fly reverse position graph
    /// instead, at a memory premium.
    fn retrograde(&self) -> bool {
        false
    }

    /// Returns the canonical positions within `parent` whose canonical
    /// children include `state`. Only called when [`Implicit::retrograde`]
    /// returns true; `state` is always canonical, and `parent` is always the
    /// canonical tier being solved.
    fn parents(&self, state: TierPosition, parent: Tier) -> Vec<Position> {
        let _ = (state, parent);
        unimplemented!("Game provides no canonical parent enumeration.")
    }
}

pub trait Codec {
    /// Decodes a position [`String`] encoding into a [`TierPosition`].
    ///
    /// This function (and [`Codec::encode`]) effectively specifies a
    /// protocol for turning a [`String`] into a [`TierPosition`]. See
    /// [`Information::info`] to make this protocol explicit.
    ///
    /// # Errors
    ///
    /// Fails if `string` is detectably invalid or unreachable in the
    /// underlying game variant.
    fn decode(&self, string: String) -> Result<TierPosition>;

    /// Encodes a game `state` into a compact string representation.
    ///
    /// The output representation is not designed to be space efficient. It
    /// is used for manual input/output.
    ///
    /// # Errors
    ///
    /// Fails if `state` is detectably invalid in the underlying variant.
    fn encode(&self, state: TierPosition) -> Result<String>;
}

pub trait Variable {
    /// Initializes a version of the underlying game as the specified
    /// `variant`.
    ///
    /// A variant is a member of a family of games whose structure is very
    /// similar. It is convenient to be able to express this because it saves
    /// a lot of needless re-writing of game logic, while allowing for a lot
    /// of generality in game implementations.
    ///
    /// # Errors
    ///
    /// Fails if `variant` does not conform to the game's protocol of
    /// encoding variants as strings.
    fn variant(variant: Variant) -> Result<Self>
    where
        Self: Sized;
}

/// Umbrella bound for games solvable by the tier solver. Implemented for
/// free on anything satisfying the component interfaces.
pub trait TierGame: Tiered + Symmetric + Implicit + Codec + Send + Sync {}

impl<G> TierGame for G where G: Tiered + Symmetric + Implicit + Codec + Send + Sync {}

/* AUXILIARY IMPLEMENTATIONS */

impl fmt::Display for TierPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tier, self.position)
    }
}
