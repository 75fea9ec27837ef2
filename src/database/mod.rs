//! # Database Module
//!
//! This module contains the memory and I/O mechanisms used to store and
//! fetch tier solution data: one array of value/remoteness records per
//! canonical tier, created by a tier worker, persisted once, and read-only
//! thereafter.

use anyhow::Result;

use std::sync::atomic::{AtomicU16, Ordering};

use crate::database::error::DatabaseError;
use crate::database::record::vr;
use crate::game::{Position, Tier, TierPosition};
use crate::solver::Outcome;

/* UTILITY MODULES */

pub mod error;

/* IMPLEMENTATION MODULES */

pub mod record {
    pub mod vr;
}

pub mod vector;
pub mod volatile;

/* DEFINITIONS */

/// The in-memory record array of a single tier, indexed by position. Cells
/// are atomic so that worker threads resolving different positions can write
/// their records concurrently; the solver's per-position counter guarantees
/// each cell is written by at most one thread, so relaxed ordering is
/// sufficient throughout.
pub struct TierRecord {
    cells: Vec<AtomicU16>,
}

/* DATABASE RESOURCE INTERFACE */

/// Represents the behavior of a store of per-tier record arrays, keyed by
/// canonical tier. Probes must be thread-safe; stores are single-writer per
/// tier (the worker solving it).
pub trait TierDatabase: Send + Sync {
    /// Returns true iff a record array has been stored for `tier`.
    fn contains(&self, tier: Tier) -> Result<bool>;

    /// Returns the full record array stored for `tier`.
    ///
    /// # Errors
    ///
    /// Fails with [`DatabaseError::MissingTier`] if no record array has been
    /// stored for `tier`, and on any I/O or decoding failure.
    fn load(&self, tier: Tier) -> Result<TierRecord>;

    /// Persists the record array `record` under `tier`, replacing any
    /// existing array.
    fn store(&self, tier: Tier, record: &TierRecord) -> Result<()>;

    /// Returns the outcome stored for `state` without materializing the
    /// whole tier, in logarithmic time or better.
    fn probe(&self, state: TierPosition) -> Result<Outcome>;

    /// Records that every canonical tier of the game has been solved. The
    /// manager calls this exactly once, after a run with no failed tiers.
    fn mark_solved(&self) -> Result<()>;

    /// Returns true iff [`TierDatabase::mark_solved`] completed on a
    /// previous or current run.
    fn is_solved(&self) -> Result<bool>;
}

/* IMPLEMENTATIONS */

impl TierRecord {
    /// Returns a new record array of `size` cells, all undecided.
    pub fn new(size: u64) -> Self {
        let mut cells = Vec::new();
        cells.resize_with(size as usize, || AtomicU16::new(0));
        TierRecord { cells }
    }

    /// Returns the number of cells in this record array.
    pub fn size(&self) -> u64 {
        self.cells.len() as u64
    }

    /// Writes `outcome` to the cell of `position`.
    ///
    /// # Errors
    ///
    /// Fails if `position` is out of bounds or `outcome` cannot be encoded.
    pub fn set(&self, position: Position, outcome: Outcome) -> Result<()> {
        let cell = self.cell(position)?;
        cell.store(vr::pack(outcome)?, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the outcome stored in the cell of `position`.
    ///
    /// # Errors
    ///
    /// Fails if `position` is out of bounds or the cell is malformed.
    pub fn get(&self, position: Position) -> Result<Outcome> {
        let cell = self.cell(position)?;
        vr::unpack(cell.load(Ordering::Relaxed))
    }

    /// Returns the byte serialization of this record array: each cell's
    /// record bytes in position order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.cells.len() * vr::RECORD_BYTES);
        for cell in &self.cells {
            bytes.extend_from_slice(
                &cell.load(Ordering::Relaxed).to_be_bytes(),
            );
        }
        bytes
    }

    /// Reconstructs a record array from its byte serialization.
    ///
    /// # Errors
    ///
    /// Fails if `bytes` is not a whole number of records, or any record's
    /// value bits are malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % vr::RECORD_BYTES != 0 {
            Err(DatabaseError::Corrupted {
                hint: format!(
                    "Record array byte length {} is not a multiple of the \
                    record width.",
                    bytes.len(),
                ),
            })?
        }

        let mut cells = Vec::with_capacity(bytes.len() / vr::RECORD_BYTES);
        for pair in bytes.chunks_exact(vr::RECORD_BYTES) {
            let raw = u16::from_be_bytes([pair[0], pair[1]]);
            let _ = vr::unpack(raw)?;
            cells.push(AtomicU16::new(raw));
        }

        Ok(TierRecord { cells })
    }

    fn cell(&self, position: Position) -> Result<&AtomicU16> {
        self.cells
            .get(position as usize)
            .ok_or_else(|| {
                DatabaseError::OutOfBounds {
                    position,
                    size: self.cells.len() as u64,
                }
                .into()
            })
    }
}
