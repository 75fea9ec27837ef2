//! # Vector Database
//!
//! This module contains a persistent implementation of the tier record
//! store. Each canonical tier is materialized as one file named by its tier
//! identifier, holding the tier's record array split into fixed-size chunks
//! of positions that are compressed independently. Probing a single position
//! therefore decompresses exactly one chunk, and parallel workers reading
//! with the same chunk granularity never decompress the same block twice.

use anyhow::{Context, Result};
use zstd::stream::{decode_all, encode_all};

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::database::error::DatabaseError;
use crate::database::record::vr;
use crate::database::{TierDatabase, TierRecord};
use crate::game::{Tier, TierPosition};
use crate::solver::Outcome;

/* CONSTANTS */

/// Leading bytes of every tier record file, for sanity checking.
const MAGIC: [u8; 4] = *b"SVR1";

/// Format version stamped after the magic bytes.
const VERSION: u8 = 1;

/// File name of the game-solved marker within a database directory.
const SOLVED_MARKER: &str = "solved";

/// File extension of tier record files.
const EXTENSION: &str = "vr";

/* DEFINITIONS */

/// A persistent tier record store rooted at a directory, usually
/// `<data-path>/<game>/<variant>/`. The chunk size is fixed per database so
/// that files written by different workers agree on layout.
pub struct Database {
    directory: PathBuf,
    chunk: u64,
}

/// Parsed header of a tier record file: dimensions plus the byte offsets of
/// each compressed chunk relative to the start of the chunk data region.
struct Header {
    size: u64,
    chunk: u64,
    offsets: Vec<u64>,
    data_start: u64,
}

/* IMPLEMENTATIONS */

impl Database {
    /// Opens (creating if necessary) a database directory at `directory`
    /// with `chunk` positions per compressed block.
    pub fn new(directory: &Path, chunk: u64) -> Result<Self> {
        fs::create_dir_all(directory).with_context(|| {
            format!(
                "Failed to create database directory {}.",
                directory.display(),
            )
        })?;
        Ok(Database {
            directory: directory.to_path_buf(),
            chunk: chunk.max(1),
        })
    }

    fn tier_path(&self, tier: Tier) -> PathBuf {
        self.directory
            .join(format!("{tier}.{EXTENSION}"))
    }

    fn read_header(&self, file: &mut File, tier: Tier) -> Result<Header> {
        let mut intro = [0u8; 5];
        file.read_exact(&mut intro)
            .context("Failed to read tier record file header.")?;
        if intro[..4] != MAGIC || intro[4] != VERSION {
            Err(DatabaseError::Corrupted {
                hint: format!(
                    "Tier {tier} record file has an unrecognized header.",
                ),
            })?
        }

        let stored_tier = read_u64(file)?;
        let size = read_u64(file)?;
        let chunk = read_u64(file)?;
        let chunk_count = read_u64(file)?;
        if stored_tier != tier || chunk == 0 {
            Err(DatabaseError::Corrupted {
                hint: format!(
                    "Tier {tier} record file header is inconsistent.",
                ),
            })?
        }

        let mut offsets = Vec::with_capacity(chunk_count as usize + 1);
        for _ in 0..=chunk_count {
            offsets.push(read_u64(file)?);
        }

        let data_start = file
            .stream_position()
            .context("Failed to locate chunk data region.")?;

        Ok(Header {
            size,
            chunk,
            offsets,
            data_start,
        })
    }

    fn read_chunk(
        &self,
        file: &mut File,
        header: &Header,
        index: usize,
    ) -> Result<Vec<u8>> {
        let begin = header.offsets[index];
        let end = header.offsets[index + 1];
        file.seek(SeekFrom::Start(header.data_start + begin))
            .context("Failed to seek to record chunk.")?;

        let mut compressed = vec![0u8; (end - begin) as usize];
        file.read_exact(&mut compressed)
            .context("Failed to read record chunk.")?;

        let bytes = decode_all(&compressed[..])
            .context("Failed to decompress record chunk.")?;
        Ok(bytes)
    }
}

impl TierDatabase for Database {
    fn contains(&self, tier: Tier) -> Result<bool> {
        Ok(self.tier_path(tier).is_file())
    }

    fn load(&self, tier: Tier) -> Result<TierRecord> {
        let path = self.tier_path(tier);
        if !path.is_file() {
            Err(DatabaseError::MissingTier { tier })?
        }

        let mut file = File::open(&path).with_context(|| {
            format!("Failed to open record file for tier {tier}.")
        })?;

        let header = self.read_header(&mut file, tier)?;
        let mut bytes =
            Vec::with_capacity((header.size as usize) * vr::RECORD_BYTES);
        for index in 0..header.offsets.len() - 1 {
            bytes.extend_from_slice(
                &self.read_chunk(&mut file, &header, index)?,
            );
        }

        let record = TierRecord::from_bytes(&bytes)?;
        if record.size() != header.size {
            Err(DatabaseError::Corrupted {
                hint: format!(
                    "Tier {tier} record file holds {} records, expected {}.",
                    record.size(),
                    header.size,
                ),
            })?
        }

        Ok(record)
    }

    fn store(&self, tier: Tier, record: &TierRecord) -> Result<()> {
        let bytes = record.to_bytes();
        let chunk_bytes = (self.chunk as usize) * vr::RECORD_BYTES;
        let chunks = bytes
            .chunks(chunk_bytes.max(vr::RECORD_BYTES))
            .collect::<Vec<&[u8]>>();

        let mut compressed = Vec::with_capacity(chunks.len());
        let mut offsets = Vec::with_capacity(chunks.len() + 1);
        let mut cursor = 0u64;
        offsets.push(cursor);
        for chunk in &chunks {
            let block = encode_all(*chunk, zstd::DEFAULT_COMPRESSION_LEVEL)
                .context("Failed to compress record chunk.")?;
            cursor += block.len() as u64;
            offsets.push(cursor);
            compressed.push(block);
        }

        let path = self.tier_path(tier);
        let mut file = File::create(&path).with_context(|| {
            format!("Failed to create record file for tier {tier}.")
        })?;

        file.write_all(&MAGIC)
            .and_then(|_| file.write_all(&[VERSION]))
            .context("Failed to write record file header.")?;
        write_u64(&mut file, tier)?;
        write_u64(&mut file, record.size())?;
        write_u64(&mut file, self.chunk)?;
        write_u64(&mut file, chunks.len() as u64)?;
        for offset in &offsets {
            write_u64(&mut file, *offset)?;
        }
        for block in &compressed {
            file.write_all(block)
                .context("Failed to write record chunk.")?;
        }

        file.sync_all()
            .context("Failed to flush record file.")?;
        Ok(())
    }

    fn probe(&self, state: TierPosition) -> Result<Outcome> {
        let tier = state.tier;
        let path = self.tier_path(tier);
        if !path.is_file() {
            Err(DatabaseError::MissingTier { tier })?
        }

        let mut file = File::open(&path).with_context(|| {
            format!("Failed to open record file for tier {tier}.")
        })?;

        let header = self.read_header(&mut file, tier)?;
        if state.position >= header.size {
            Err(DatabaseError::OutOfBounds {
                position: state.position,
                size: header.size,
            })?
        }

        let index = (state.position / header.chunk) as usize;
        let bytes = self.read_chunk(&mut file, &header, index)?;
        let within = ((state.position % header.chunk) as usize)
            * vr::RECORD_BYTES;
        if within + vr::RECORD_BYTES > bytes.len() {
            Err(DatabaseError::Corrupted {
                hint: format!(
                    "Tier {tier} chunk {index} is shorter than its position \
                    range.",
                ),
            })?
        }

        vr::unpack(u16::from_be_bytes([bytes[within], bytes[within + 1]]))
    }

    fn mark_solved(&self) -> Result<()> {
        fs::write(self.directory.join(SOLVED_MARKER), [1u8])
            .context("Failed to write game-solved marker.")?;
        Ok(())
    }

    fn is_solved(&self) -> Result<bool> {
        Ok(self
            .directory
            .join(SOLVED_MARKER)
            .is_file())
    }
}

/* FILE ENCODING HELPERS */

fn read_u64(file: &mut File) -> Result<u64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf)
        .context("Failed to read record file field.")?;
    Ok(u64::from_be_bytes(buf))
}

fn write_u64(file: &mut File, value: u64) -> Result<()> {
    file.write_all(&value.to_be_bytes())
        .context("Failed to write record file field.")?;
    Ok(())
}
