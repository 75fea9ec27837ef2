//! # Dispatch Model Module
//!
//! The contract between the tier manager and the layer that assigns "solve
//! this tier" work units to workers, together with the logical protocol the
//! multi-process dispatcher speaks and its fixed-size wire encoding.

use anyhow::Result;

use std::fmt;

use crate::database::error::DatabaseError;
use crate::game::error::GameError;
use crate::game::Tier;
use crate::solver::error::SolverError;
use crate::solver::worker::WorkStatus;

/* DISPATCHER CONTRACT */

/// A unit of work the manager hands to the dispatch layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Job {
    pub tier: Tier,
    pub force: bool,
}

/// The terminal state of a dispatched job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Finished(WorkStatus),
    Failed(String),
}

/// A finished job as observed by the manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub tier: Tier,
    pub outcome: JobOutcome,
}

/// Assigns tier solves to workers and reports their completions. The
/// manager never cares whether workers are threads in this process or ranks
/// on other machines; it only promises to keep at most
/// [`Dispatcher::capacity`] jobs outstanding and to call
/// [`Dispatcher::collect`] once per submitted job.
pub trait Dispatcher {
    /// Returns the number of jobs that may be outstanding at once.
    fn capacity(&self) -> usize;

    /// Hands `job` to some worker.
    fn submit(&mut self, job: Job) -> Result<()>;

    /// Blocks until some outstanding job finishes and returns it.
    fn collect(&mut self) -> Result<Completion>;

    /// Releases all workers. Called once, after the last collection.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/* PROTOCOL MESSAGES */

/// Commands the manager sends to workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Solve = 0,
    ForceSolve = 1,
    Sleep = 2,
    Terminate = 3,
}

/// Requests and reports workers send to the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Request {
    Check = 0,
    ReportSolved = 1,
    ReportLoaded = 2,
    ReportError = 3,
}

/// A protocol message in either direction. Only the fields relevant to the
/// kind are meaningful; the rest are zero on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    pub kind: u8,
    pub tier: Tier,
    pub error: i32,
}

/// The exact size of an encoded [`Packet`].
pub const PACKET_BYTES: usize = 13;

/* ERROR CODES */

/// Code sent in a [`Request::ReportError`] packet when the error kind could
/// not be classified further.
pub const ERROR_UNKNOWN: i32 = 1;

/// Classifies `error` into the wire protocol's error code space.
pub fn error_code(error: &anyhow::Error) -> i32 {
    if let Some(solver) = error.downcast_ref::<SolverError>() {
        match solver {
            SolverError::RemotenessOverflow { .. } => 2,
            SolverError::OutOfMemory { .. } => 3,
            SolverError::RecordViolation { .. } => 4,
            SolverError::SolverViolation { .. } => 4,
        }
    } else if error.downcast_ref::<GameError>().is_some() {
        5
    } else if error.downcast_ref::<DatabaseError>().is_some() {
        6
    } else {
        ERROR_UNKNOWN
    }
}

/// Returns a human-readable description of a wire error code.
pub fn describe(code: i32) -> &'static str {
    match code {
        2 => "remoteness overflow",
        3 => "allocation failure",
        4 => "solver violation",
        5 => "game contract violation",
        6 => "database failure",
        _ => "unclassified worker error",
    }
}

/* IMPLEMENTATIONS */

impl Packet {
    /// Returns a packet carrying `command` about `tier`.
    pub fn command(command: Command, tier: Tier) -> Self {
        Packet {
            kind: command as u8,
            tier,
            error: 0,
        }
    }

    /// Returns a packet carrying `request`, with `error` meaningful only
    /// for [`Request::ReportError`].
    pub fn request(request: Request, error: i32) -> Self {
        Packet {
            kind: request as u8,
            tier: 0,
            error,
        }
    }

    /// Encodes this packet into its fixed-size wire representation.
    pub fn to_bytes(&self) -> [u8; PACKET_BYTES] {
        let mut bytes = [0u8; PACKET_BYTES];
        bytes[0] = self.kind;
        bytes[1..9].copy_from_slice(&self.tier.to_be_bytes());
        bytes[9..13].copy_from_slice(&self.error.to_be_bytes());
        bytes
    }

    /// Decodes a packet from its fixed-size wire representation.
    pub fn from_bytes(bytes: &[u8; PACKET_BYTES]) -> Self {
        let mut tier = [0u8; 8];
        tier.copy_from_slice(&bytes[1..9]);
        let mut error = [0u8; 4];
        error.copy_from_slice(&bytes[9..13]);
        Packet {
            kind: bytes[0],
            tier: Tier::from_be_bytes(tier),
            error: i32::from_be_bytes(error),
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        match raw {
            0 => Ok(Command::Solve),
            1 => Ok(Command::ForceSolve),
            2 => Ok(Command::Sleep),
            3 => Ok(Command::Terminate),
            unknown => Err(unknown),
        }
    }
}

impl TryFrom<u8> for Request {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        match raw {
            0 => Ok(Request::Check),
            1 => Ok(Request::ReportSolved),
            2 => Ok(Request::ReportLoaded),
            3 => Ok(Request::ReportError),
            unknown => Err(unknown),
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Finished(WorkStatus::Solved) => write!(f, "solved"),
            JobOutcome::Finished(WorkStatus::Loaded) => write!(f, "loaded"),
            JobOutcome::Failed(hint) => write!(f, "failed: {hint}"),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn packets_survive_the_wire() {
        let cases = [
            Packet::command(Command::Solve, 42),
            Packet::command(Command::Terminate, u64::MAX),
            Packet::request(Request::Check, 0),
            Packet::request(Request::ReportError, -7),
        ];
        for packet in cases {
            assert_eq!(Packet::from_bytes(&packet.to_bytes()), packet);
        }
    }

    #[test]
    fn unknown_message_kinds_are_surfaced() {
        assert_eq!(Command::try_from(9), Err(9));
        assert_eq!(Request::try_from(200), Err(200));
    }

    #[test]
    fn error_codes_classify_kinds() {
        let overflow: anyhow::Error =
            crate::solver::error::SolverError::RemotenessOverflow { tier: 0 }
                .into();
        assert_eq!(error_code(&overflow), 2);

        let cycle: anyhow::Error =
            crate::game::error::GameError::TierCycle { tier: 1 }.into();
        assert_eq!(error_code(&cycle), 5);

        let vague = anyhow::anyhow!("something else");
        assert_eq!(error_code(&vague), ERROR_UNKNOWN);
    }
}
