//! # Pool Dispatcher Module
//!
//! In-process implementation of the dispatch contract. A fixed pool of
//! worker threads pulls tier solves from a shared queue; each solve uses
//! the process-wide rayon pool internally, so this layer only provides
//! inter-tier concurrency and completion reporting.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::database::TierDatabase;
use crate::game::TierGame;
use crate::solver::dispatch::{Completion, Dispatcher, Job, JobOutcome};
use crate::solver::worker;

/* DEFINITIONS */

/// A dispatcher backed by a pool of worker threads within this process.
pub struct PoolDispatcher {
    jobs: Option<Sender<Job>>,
    reports: Receiver<Completion>,
    handles: Vec<JoinHandle<()>>,
    capacity: usize,
}

/* IMPLEMENTATIONS */

impl PoolDispatcher {
    /// Spawns `workers` threads solving tiers of `game` against `db`.
    pub fn new<G, D>(game: Arc<G>, db: Arc<D>, workers: usize) -> Self
    where
        G: TierGame + 'static,
        D: TierDatabase + 'static,
    {
        let workers = workers.max(1);
        let (jobs, intake) = unbounded::<Job>();
        let (outbox, reports) = unbounded::<Completion>();

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let intake = intake.clone();
            let outbox = outbox.clone();
            let game = game.clone();
            let db = db.clone();
            handles.push(std::thread::spawn(move || {
                debug!("Pool worker {index} up.");
                while let Ok(job) = intake.recv() {
                    let outcome = match worker::solve(
                        &*game,
                        &*db,
                        job.tier,
                        job.force,
                    ) {
                        Ok(status) => JobOutcome::Finished(status),
                        Err(e) => JobOutcome::Failed(format!("{e:#}")),
                    };
                    if outbox
                        .send(Completion {
                            tier: job.tier,
                            outcome,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                debug!("Pool worker {index} down.");
            }));
        }

        PoolDispatcher {
            jobs: Some(jobs),
            reports,
            handles,
            capacity: workers,
        }
    }
}

impl Dispatcher for PoolDispatcher {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn submit(&mut self, job: Job) -> Result<()> {
        self.jobs
            .as_ref()
            .context("Dispatcher used after shutdown.")?
            .send(job)
            .context("Worker pool hung up before accepting a job.")?;
        Ok(())
    }

    fn collect(&mut self) -> Result<Completion> {
        self.reports
            .recv()
            .context("Worker pool hung up before reporting a job.")
    }

    fn shutdown(&mut self) -> Result<()> {
        drop(self.jobs.take());
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for PoolDispatcher {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
