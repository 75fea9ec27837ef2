//! # General Utilities Module
//!
//! This module makes room for verbose or repeated routines used across the
//! crate: work partitioning for the parallel position loops, the process's
//! thread-count configuration, and output plumbing for the CLI.

use anyhow::{Context, Result};

use std::env;
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

/* ENVIRONMENT */

/// Environment variable overriding the number of threads used for
/// intra-tier parallelism and worker pools. The only environment input the
/// solver reads.
pub const THREADS_ENV: &str = "STRATA_THREADS";

/// Returns the number of threads to use, preferring the [`THREADS_ENV`]
/// override and falling back to the host's logical CPU count.
pub fn thread_count() -> usize {
    env::var(THREADS_ENV)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|&count| count > 0)
        .unwrap_or_else(num_cpus::get)
}

/* WORK PARTITIONING */

/// Splits `0..total` into consecutive ranges of at most `chunk` elements,
/// for dynamic scheduling of position loops. The chunk granularity should
/// match the database's compression block so two workers never decompress
/// the same block.
pub fn chunk_ranges(total: u64, chunk: u64) -> Vec<Range<u64>> {
    let chunk = chunk.max(1);
    let mut ranges = Vec::with_capacity(total.div_ceil(chunk) as usize);
    let mut begin = 0;
    while begin < total {
        let end = (begin + chunk).min(total);
        ranges.push(begin..end);
        begin = end;
    }
    ranges
}

/* OUTPUT PLUMBING */

/// Writes `content` (with a trailing newline) to the file at `output`, or
/// to STDOUT when no path is provided.
pub fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, format!("{content}\n"))
            .with_context(|| {
                format!("Failed to write output to {}.", path.display())
            }),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")
                .context("Failed to write output to STDOUT.")
        },
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn chunks_cover_the_range_exactly() {
        let ranges = chunk_ranges(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);

        let total: u64 = ranges.iter().map(|r| r.end - r.start).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn degenerate_chunking_is_safe() {
        assert!(chunk_ranges(0, 4).is_empty());
        assert_eq!(chunk_ranges(3, 0), vec![0..1, 1..2, 2..3]);
        assert_eq!(chunk_ranges(2, 100), vec![0..2]);
    }
}
