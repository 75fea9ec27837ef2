//! # Frontier Module
//!
//! Staging buffers for solved positions awaiting propagation to their
//! parents. One frontier exists per value class (win, lose, tie); inside
//! each, positions are bucketed by remoteness stratum and by the thread that
//! discovered them, so appends never contend. Dividers record where each
//! originating tier's entries end within a bucket, which lets propagation
//! recover the tier a position came from without storing it per entry.

use rayon::current_thread_index;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;

use crate::game::Position;
use crate::solver::error::SolverError;
use crate::solver::{Remoteness, MAX_REMOTENESS};

/* DEFINITIONS */

/// A value class's staging buffers for one tier solve. Strata are allocated
/// for every representable remoteness up front; their vectors remain empty
/// (and unallocated) until used.
pub struct Frontier {
    strata: Vec<Stratum>,
    threads: usize,
    peak: AtomicUsize,
}

/// One remoteness stratum: an append-only bucket per thread slot. Each
/// bucket's mutex is only ever taken by the rayon worker owning the slot
/// during parallel sections, so contention does not arise.
struct Stratum {
    buckets: Vec<Mutex<Bucket>>,
}

#[derive(Default)]
struct Bucket {
    positions: Vec<Position>,
    dividers: Vec<usize>,
}

/* IMPLEMENTATIONS */

impl Frontier {
    /// Returns an empty frontier with `threads` bucket slots per stratum.
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let mut strata = Vec::with_capacity(MAX_REMOTENESS as usize + 1);
        strata.resize_with(MAX_REMOTENESS as usize + 1, || Stratum {
            buckets: {
                let mut buckets = Vec::with_capacity(threads);
                buckets.resize_with(threads, Mutex::default);
                buckets
            },
        });
        Frontier {
            strata,
            threads,
            peak: AtomicUsize::new(0),
        }
    }

    /// Appends `position` to the calling thread's bucket of stratum
    /// `remoteness`. Amortized O(1).
    ///
    /// # Errors
    ///
    /// Fails only when the bucket cannot grow, with
    /// [`SolverError::OutOfMemory`].
    pub fn add(
        &self,
        remoteness: Remoteness,
        position: Position,
    ) -> Result<()> {
        let slot = current_thread_index().unwrap_or(0) % self.threads;
        let mut bucket = lock(&self.strata[remoteness as usize].buckets[slot]);
        bucket
            .positions
            .try_reserve(1)
            .map_err(|_| SolverError::OutOfMemory {
                what: "a frontier stratum",
            })?;
        bucket.positions.push(position);

        self.peak
            .fetch_max(remoteness as usize, Ordering::Relaxed);
        Ok(())
    }

    /// Closes the currently staged tier across every stratum and bucket, so
    /// that entries added afterwards resolve to the next tier index. Callers
    /// stage tiers sequentially; the divider sequences this produces are the
    /// running totals the tier lookup in [`Frontier::take`] requires.
    pub fn seal(&self) {
        for stratum in &self.strata {
            for bucket in &stratum.buckets {
                let mut bucket = lock(bucket);
                let sealed = bucket.positions.len();
                bucket.dividers.push(sealed);
            }
        }
    }

    /// Removes and returns stratum `remoteness` as a flat list of positions
    /// paired with the index of their originating tier (in staging order;
    /// entries added after the last seal map to the index one past it).
    /// Releases the stratum's storage.
    pub fn take(&self, remoteness: Remoteness) -> Vec<(Position, usize)> {
        let stratum = &self.strata[remoteness as usize];
        let mut entries = Vec::new();
        for bucket in &stratum.buckets {
            let bucket = std::mem::take(&mut *lock(bucket));
            for (index, position) in bucket.positions.into_iter().enumerate() {
                let origin = bucket
                    .dividers
                    .partition_point(|&end| end <= index);
                entries.push((position, origin));
            }
        }
        entries
    }

    /// Returns the highest remoteness any entry was ever staged at. Strata
    /// above this are guaranteed empty, which lets propagation stop early.
    pub fn peak(&self) -> Remoteness {
        self.peak.load(Ordering::Relaxed) as Remoteness
    }
}

fn lock<'a>(bucket: &'a Mutex<Bucket>) -> std::sync::MutexGuard<'a, Bucket> {
    bucket
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn entries_resolve_to_their_staged_tier() -> Result<()> {
        let frontier = Frontier::new(1);

        frontier.add(0, 10)?;
        frontier.add(2, 11)?;
        frontier.seal();

        frontier.add(0, 20)?;
        frontier.seal();

        frontier.add(0, 30)?;
        frontier.add(2, 31)?;

        let zero = frontier.take(0);
        assert_eq!(zero, vec![(10, 0), (20, 1), (30, 2)]);

        let two = frontier.take(2);
        assert_eq!(two, vec![(11, 0), (31, 2)]);
        Ok(())
    }

    #[test]
    fn taking_a_stratum_frees_it() -> Result<()> {
        let frontier = Frontier::new(2);
        frontier.add(5, 1)?;
        frontier.seal();

        assert_eq!(frontier.take(5).len(), 1);
        assert!(frontier.take(5).is_empty());
        Ok(())
    }

    #[test]
    fn peak_tracks_highest_stratum() -> Result<()> {
        let frontier = Frontier::new(1);
        assert_eq!(frontier.peak(), 0);

        frontier.add(7, 0)?;
        frontier.add(3, 0)?;
        assert_eq!(frontier.peak(), 7);
        Ok(())
    }

    #[test]
    fn empty_strata_yield_nothing() {
        let frontier = Frontier::new(4);
        assert!(frontier.take(MAX_REMOTENESS).is_empty());
    }
}
