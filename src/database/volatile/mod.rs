//! # Volatile Database
//!
//! This module contains an in-memory implementation of the tier record
//! store, used for tests and for runs whose results are not worth keeping.
//! Nothing remains after the process exits.

use anyhow::Result;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::database::error::DatabaseError;
use crate::database::record::vr;
use crate::database::{TierDatabase, TierRecord};
use crate::game::{Tier, TierPosition};
use crate::solver::Outcome;

/* DEFINITIONS */

/// An in-memory tier record store. Arrays are kept as their byte
/// serializations so that loads hand out independent copies, mirroring the
/// read-only semantics of the persistent store.
pub struct Database {
    tiers: RwLock<HashMap<Tier, Vec<u8>>>,
    solved: AtomicBool,
}

/* IMPLEMENTATIONS */

impl Database {
    pub fn new() -> Self {
        Database {
            tiers: RwLock::new(HashMap::new()),
            solved: AtomicBool::new(false),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl TierDatabase for Database {
    fn contains(&self, tier: Tier) -> Result<bool> {
        let tiers = self
            .tiers
            .read()
            .map_err(|_| DatabaseError::Corrupted {
                hint: "Volatile store lock poisoned.".into(),
            })?;
        Ok(tiers.contains_key(&tier))
    }

    fn load(&self, tier: Tier) -> Result<TierRecord> {
        let tiers = self
            .tiers
            .read()
            .map_err(|_| DatabaseError::Corrupted {
                hint: "Volatile store lock poisoned.".into(),
            })?;
        let bytes = tiers
            .get(&tier)
            .ok_or(DatabaseError::MissingTier { tier })?;
        TierRecord::from_bytes(bytes)
    }

    fn store(&self, tier: Tier, record: &TierRecord) -> Result<()> {
        let mut tiers = self
            .tiers
            .write()
            .map_err(|_| DatabaseError::Corrupted {
                hint: "Volatile store lock poisoned.".into(),
            })?;
        tiers.insert(tier, record.to_bytes());
        Ok(())
    }

    fn probe(&self, state: TierPosition) -> Result<Outcome> {
        let tiers = self
            .tiers
            .read()
            .map_err(|_| DatabaseError::Corrupted {
                hint: "Volatile store lock poisoned.".into(),
            })?;
        let bytes = tiers
            .get(&state.tier)
            .ok_or(DatabaseError::MissingTier { tier: state.tier })?;

        let offset = (state.position as usize) * vr::RECORD_BYTES;
        if offset + vr::RECORD_BYTES > bytes.len() {
            Err(DatabaseError::OutOfBounds {
                position: state.position,
                size: (bytes.len() / vr::RECORD_BYTES) as u64,
            })?
        }
        vr::unpack(u16::from_be_bytes([bytes[offset], bytes[offset + 1]]))
    }

    fn mark_solved(&self) -> Result<()> {
        self.solved.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_solved(&self) -> Result<bool> {
        Ok(self.solved.load(Ordering::Relaxed))
    }
}
