//! # Value-Remoteness (VR) Record Module
//!
//! Implementation of a database record buffer for storing the value and the
//! remoteness associated with a particular game position. One record is kept
//! per position index of a tier, so the layout is fixed-width and as small
//! as the remoteness bound allows.

use anyhow::Result;
use bitvec::field::BitField;
use bitvec::order::Msb0;
use bitvec::view::BitView;

use crate::solver::error::SolverError::RecordViolation;
use crate::solver::{Outcome, Remoteness, Value, MAX_REMOTENESS};

/* CONSTANTS */

/// The exact number of bits that are used to encode a position's value.
pub const VALUE_SIZE: usize = 3;

/// The exact number of bits that are used to encode remoteness.
pub const REMOTENESS_SIZE: usize = 10;

/// The exact number of bytes that are used to encode a single record.
pub const RECORD_BYTES: usize = 2;

/* RECORD IMPLEMENTATION */

/// Database record buffer communicating the value and remoteness of a
/// single game position. The layout is as follows:
///
/// ```none
/// [VALUE_SIZE bits: Value]
/// [REMOTENESS_SIZE bits: Remoteness]
/// [0b0 until RECORD_BYTES * 8]
/// ```
///
/// Both fields are encoded in big-endian. The all-zero record encodes an
/// undecided position with zero remoteness, so freshly allocated storage is
/// already a valid record array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordBuffer {
    buf: [u8; RECORD_BYTES],
}

impl RecordBuffer {
    /// Returns a new record buffer encoding `outcome`.
    ///
    /// # Errors
    ///
    /// Fails if the remoteness does not fit in [`REMOTENESS_SIZE`] bits, or
    /// if a remoteness is attached to a value that carries none.
    pub fn new(outcome: Outcome) -> Result<Self> {
        if outcome.remoteness > MAX_REMOTENESS {
            Err(RecordViolation {
                hint: format!(
                    "This record can only hold remoteness values up to \
                    {MAX_REMOTENESS}, but there was an attempt to encode a \
                    remoteness of {}.",
                    outcome.remoteness,
                ),
            })?
        }

        let mut buf = [0u8; RECORD_BYTES];
        let bits = buf.view_bits_mut::<Msb0>();
        bits[..VALUE_SIZE].store_be(outcome.value as u8);
        bits[VALUE_SIZE..VALUE_SIZE + REMOTENESS_SIZE]
            .store_be(outcome.remoteness);

        Ok(RecordBuffer { buf })
    }

    /// Returns the record buffer described by `raw` (the big-endian
    /// interpretation of the buffer's bytes).
    ///
    /// # Errors
    ///
    /// Fails if the value bits of `raw` encode no known value.
    pub fn from_raw(raw: u16) -> Result<Self> {
        let this = RecordBuffer {
            buf: raw.to_be_bytes(),
        };
        let _ = this.decode()?;
        Ok(this)
    }

    /// Returns the big-endian interpretation of this record's bytes, which
    /// is the form tier records keep in memory.
    pub fn raw(&self) -> u16 {
        u16::from_be_bytes(self.buf)
    }

    /// Returns a reference to this record's byte encoding.
    pub fn bytes(&self) -> &[u8; RECORD_BYTES] {
        &self.buf
    }

    /// Returns the outcome encoded by this record.
    ///
    /// # Errors
    ///
    /// Fails if the value bits encode no known value.
    pub fn decode(&self) -> Result<Outcome> {
        let bits = self.buf.view_bits::<Msb0>();
        let value = Value::try_from(bits[..VALUE_SIZE].load_be::<u8>())?;
        let remoteness = bits[VALUE_SIZE..VALUE_SIZE + REMOTENESS_SIZE]
            .load_be::<Remoteness>();

        Ok(Outcome { value, remoteness })
    }
}

/* RAW ENCODING SHORTHAND */

/// Encodes `outcome` into its in-memory 16-bit record representation.
pub fn pack(outcome: Outcome) -> Result<u16> {
    Ok(RecordBuffer::new(outcome)?.raw())
}

/// Decodes an in-memory 16-bit record representation into an outcome.
pub fn unpack(raw: u16) -> Result<Outcome> {
    RecordBuffer {
        buf: raw.to_be_bytes(),
    }
    .decode()
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn zeroed_buffer_is_undecided() {
        assert_eq!(unpack(0).unwrap(), Outcome::UNDECIDED);
    }

    #[test]
    fn outcomes_survive_packing() -> Result<()> {
        let cases = [
            (Value::Win, 0),
            (Value::Lose, 1),
            (Value::Tie, 512),
            (Value::Win, MAX_REMOTENESS),
            (Value::Draw, 0),
        ];
        for (value, remoteness) in cases {
            let outcome = Outcome { value, remoteness };
            assert_eq!(unpack(pack(outcome)?)?, outcome);
        }
        Ok(())
    }

    #[test]
    fn oversized_remoteness_is_rejected() {
        let outcome = Outcome {
            value: Value::Win,
            remoteness: MAX_REMOTENESS + 1,
        };
        assert!(RecordBuffer::new(outcome).is_err());
    }

    #[test]
    fn unknown_value_bits_are_rejected() {
        let raw = (0b111u16) << (16 - VALUE_SIZE);
        assert!(RecordBuffer::from_raw(raw).is_err());
    }
}
