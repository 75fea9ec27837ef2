//! # Remote Dispatcher Module
//!
//! Implementation of the dispatch contract as a logical manager/worker
//! protocol between ranks: rank zero runs the manager, every other rank
//! runs [`worker_loop`]. Workers poll the manager with check requests and
//! receive solve, sleep, or terminate commands; the manager remembers which
//! tier each rank is solving, since reports only identify their rank. The
//! protocol runs over a [`Transport`] pair; the bundled implementation
//! connects ranks with in-process channels carrying encoded packets, and an
//! MPI-style transport can be substituted without touching the protocol.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::warn;

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use crate::database::TierDatabase;
use crate::game::TierGame;
use crate::solver::dispatch::{
    describe, error_code, Command, Completion, Dispatcher, Job, JobOutcome,
    Packet, Request, PACKET_BYTES,
};
use crate::solver::error::SolverError;
use crate::solver::worker::{self, WorkStatus};

/* TRANSPORT CONTRACTS */

/// The manager's view of the message fabric connecting it to worker ranks.
pub trait ManagerTransport {
    /// Returns the number of worker ranks on the fabric.
    fn ranks(&self) -> usize;

    /// Sends `packet` to worker `rank`. May block.
    fn send(&self, rank: usize, packet: Packet) -> Result<()>;

    /// Blocks until any worker sends a packet, returning its rank.
    fn recv_any(&self) -> Result<(usize, Packet)>;
}

/// One worker rank's view of the message fabric.
pub trait WorkerTransport {
    /// Sends `packet` to the manager. May block.
    fn send(&self, packet: Packet) -> Result<()>;

    /// Blocks until the manager sends a packet to this rank.
    fn recv(&self) -> Result<Packet>;
}

/* CHANNEL TRANSPORT */

/// Manager end of an in-process channel fabric.
pub struct ChannelHub {
    to_workers: Vec<Sender<[u8; PACKET_BYTES]>>,
    from_workers: Receiver<(usize, [u8; PACKET_BYTES])>,
}

/// Worker end of an in-process channel fabric.
pub struct ChannelEndpoint {
    rank: usize,
    to_manager: Sender<(usize, [u8; PACKET_BYTES])>,
    from_manager: Receiver<[u8; PACKET_BYTES]>,
}

/// Builds a channel fabric connecting one manager to `workers` ranks.
/// Packets cross the fabric in their wire encoding, so this transport
/// exercises the same format a multi-process deployment would.
pub fn channel_network(
    workers: usize,
) -> (ChannelHub, Vec<ChannelEndpoint>) {
    let (to_manager, from_workers) = unbounded();
    let mut to_workers = Vec::with_capacity(workers);
    let mut endpoints = Vec::with_capacity(workers);
    for rank in 0..workers {
        let (sender, from_manager) = unbounded();
        to_workers.push(sender);
        endpoints.push(ChannelEndpoint {
            rank,
            to_manager: to_manager.clone(),
            from_manager,
        });
    }
    (
        ChannelHub {
            to_workers,
            from_workers,
        },
        endpoints,
    )
}

impl ManagerTransport for ChannelHub {
    fn ranks(&self) -> usize {
        self.to_workers.len()
    }

    fn send(&self, rank: usize, packet: Packet) -> Result<()> {
        self.to_workers
            .get(rank)
            .with_context(|| format!("No worker rank {rank} exists."))?
            .send(packet.to_bytes())
            .with_context(|| format!("Worker rank {rank} hung up."))?;
        Ok(())
    }

    fn recv_any(&self) -> Result<(usize, Packet)> {
        let (rank, bytes) = self
            .from_workers
            .recv()
            .context("Every worker rank hung up.")?;
        Ok((rank, Packet::from_bytes(&bytes)))
    }
}

impl WorkerTransport for ChannelEndpoint {
    fn send(&self, packet: Packet) -> Result<()> {
        self.to_manager
            .send((self.rank, packet.to_bytes()))
            .context("The manager hung up.")?;
        Ok(())
    }

    fn recv(&self) -> Result<Packet> {
        let bytes = self
            .from_manager
            .recv()
            .context("The manager hung up.")?;
        Ok(Packet::from_bytes(&bytes))
    }
}

/* WORKER LOOP */

/// Steady state of a worker rank: check in with the manager, act on its
/// command, loop. Sleep commands wait `nap` before checking in again.
/// Returns on a terminate command; an unrecognized command byte is treated
/// as terminate.
pub fn worker_loop<G, D, T>(
    game: &G,
    db: &D,
    transport: &T,
    nap: Duration,
) -> Result<()>
where
    G: TierGame + ?Sized,
    D: TierDatabase + ?Sized,
    T: WorkerTransport,
{
    loop {
        transport.send(Packet::request(Request::Check, 0))?;
        let packet = transport.recv()?;
        match Command::try_from(packet.kind) {
            Ok(command @ (Command::Solve | Command::ForceSolve)) => {
                let force = command == Command::ForceSolve;
                let reply =
                    match worker::solve(game, db, packet.tier, force) {
                        Ok(WorkStatus::Solved) => {
                            Packet::request(Request::ReportSolved, 0)
                        },
                        Ok(WorkStatus::Loaded) => {
                            Packet::request(Request::ReportLoaded, 0)
                        },
                        Err(e) => {
                            warn!(
                                "Failed to solve tier {}: {e:#}",
                                packet.tier,
                            );
                            Packet::request(
                                Request::ReportError,
                                error_code(&e),
                            )
                        },
                    };
                transport.send(reply)?;
            },
            Ok(Command::Sleep) => thread::sleep(nap),
            Ok(Command::Terminate) => break,
            Err(unknown) => {
                warn!(
                    "Treating unrecognized command byte {unknown} as a \
                    terminate order.",
                );
                break;
            },
        }
    }
    Ok(())
}

/* MANAGER-SIDE DISPATCHER */

/// A dispatcher that schedules submitted jobs onto worker ranks as they
/// check in, over any [`ManagerTransport`].
pub struct RemoteDispatcher<T: ManagerTransport> {
    transport: T,
    pending: VecDeque<Job>,
    assigned: Vec<Option<Job>>,
    tallies: Vec<u64>,
}

impl<T: ManagerTransport> RemoteDispatcher<T> {
    pub fn new(transport: T) -> Self {
        let ranks = transport.ranks();
        RemoteDispatcher {
            transport,
            pending: VecDeque::new(),
            assigned: vec![None; ranks],
            tallies: vec![0; ranks],
        }
    }

    /// Returns how many jobs each rank has finished, indexed by rank.
    pub fn tallies(&self) -> &[u64] {
        &self.tallies
    }

    fn reported(&mut self, rank: usize) -> Result<Job> {
        self.assigned
            .get_mut(rank)
            .and_then(Option::take)
            .ok_or_else(|| {
                SolverError::SolverViolation {
                    hint: format!(
                        "Rank {rank} reported a result without an assigned \
                        tier.",
                    ),
                }
                .into()
            })
    }
}

impl<T: ManagerTransport> Dispatcher for RemoteDispatcher<T> {
    fn capacity(&self) -> usize {
        self.transport.ranks()
    }

    fn submit(&mut self, job: Job) -> Result<()> {
        self.pending.push_back(job);
        Ok(())
    }

    fn collect(&mut self) -> Result<Completion> {
        loop {
            let (rank, packet) = self.transport.recv_any()?;
            match Request::try_from(packet.kind) {
                Ok(Request::Check) => {
                    if let Some(job) = self.pending.pop_front() {
                        let command = if job.force {
                            Command::ForceSolve
                        } else {
                            Command::Solve
                        };
                        self.transport
                            .send(rank, Packet::command(command, job.tier))?;
                        self.assigned[rank] = Some(job);
                    } else {
                        self.transport
                            .send(rank, Packet::command(Command::Sleep, 0))?;
                    }
                },
                Ok(Request::ReportSolved) => {
                    let job = self.reported(rank)?;
                    self.tallies[rank] += 1;
                    return Ok(Completion {
                        tier: job.tier,
                        outcome: JobOutcome::Finished(WorkStatus::Solved),
                    });
                },
                Ok(Request::ReportLoaded) => {
                    let job = self.reported(rank)?;
                    self.tallies[rank] += 1;
                    return Ok(Completion {
                        tier: job.tier,
                        outcome: JobOutcome::Finished(WorkStatus::Loaded),
                    });
                },
                Ok(Request::ReportError) => {
                    let job = self.reported(rank)?;
                    return Ok(Completion {
                        tier: job.tier,
                        outcome: JobOutcome::Failed(
                            describe(packet.error).to_owned(),
                        ),
                    });
                },
                Err(unknown) => {
                    warn!(
                        "Ignoring unrecognized request byte {unknown} from \
                        rank {rank}.",
                    );
                },
            }
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        for rank in 0..self.transport.ranks() {
            self.transport
                .send(rank, Packet::command(Command::Terminate, 0))?;
        }
        Ok(())
    }
}
