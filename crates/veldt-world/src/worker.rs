//! Background tile generation workers.
//!
//! A fixed pool of threads pulls generation jobs off a channel and sends
//! completed tiles back. Jobs carry the epoch they were submitted under;
//! workers skip jobs whose epoch has been superseded, so a fast-moving
//! observer does not pay for tiles it has already left behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace};

use veldt_common::coords::TileCoord;
use veldt_common::error::GenError;

use crate::generator::{GeneratedTile, TileGenerator};

/// A unit of background work.
struct GenJob {
    coord: TileCoord,
    epoch: u64,
}

/// Result of one background job.
pub(crate) enum JobOutcome {
    /// Generation succeeded.
    Generated {
        /// Which tile was generated.
        coord: TileCoord,
        /// The generated content.
        tile: Box<GeneratedTile>,
        /// Wall time the worker spent generating.
        elapsed: Duration,
    },
    /// Generation failed; the tile stays absent and may be retried.
    Failed {
        /// Which tile failed.
        coord: TileCoord,
        /// Why.
        error: GenError,
    },
    /// The job's epoch was superseded before the worker started it.
    Stale {
        /// Which tile was skipped.
        coord: TileCoord,
    },
}

/// Fixed-size pool of generation workers.
pub(crate) struct GenerationPool {
    jobs: Option<Sender<GenJob>>,
    results: Receiver<JobOutcome>,
    epoch: Arc<AtomicU64>,
    workers: Vec<JoinHandle<()>>,
}

impl GenerationPool {
    /// Spawns `workers` threads sharing one generator.
    pub(crate) fn new(generator: Arc<TileGenerator>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<GenJob>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<JobOutcome>();
        let epoch = Arc::new(AtomicU64::new(0));

        let handles = (0..workers)
            .map(|worker_id| {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let generator = Arc::clone(&generator);
                let epoch = Arc::clone(&epoch);
                thread::Builder::new()
                    .name(format!("veldt-gen-{worker_id}"))
                    .spawn(move || worker_loop(&jobs, &results, &generator, &epoch))
                    .unwrap_or_else(|e| panic!("failed to spawn generation worker: {e}"))
            })
            .collect();

        debug!(workers, "generation pool started");
        Self {
            jobs: Some(job_tx),
            results: result_rx,
            epoch,
            workers: handles,
        }
    }

    /// Number of worker threads.
    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Starts a new submission epoch, invalidating unstarted older jobs.
    pub(crate) fn begin_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Submits a tile for background generation under the given epoch.
    pub(crate) fn submit(&self, coord: TileCoord, epoch: u64) {
        if let Some(jobs) = &self.jobs {
            // Send only fails after shutdown, when no results are expected.
            let _ = jobs.send(GenJob { coord, epoch });
        }
    }

    /// Blocks until the next job outcome arrives.
    pub(crate) fn recv(&self) -> Option<JobOutcome> {
        self.results.recv().ok()
    }
}

impl Drop for GenerationPool {
    fn drop(&mut self) {
        // Closing the job channel lets every worker drain and exit.
        self.jobs = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    jobs: &Receiver<GenJob>,
    results: &Sender<JobOutcome>,
    generator: &TileGenerator,
    epoch: &AtomicU64,
) {
    for job in jobs.iter() {
        if job.epoch < epoch.load(Ordering::SeqCst) {
            trace!(tile = %job.coord, "skipping superseded job");
            if results.send(JobOutcome::Stale { coord: job.coord }).is_err() {
                return;
            }
            continue;
        }

        let start = Instant::now();
        let outcome = match generator.generate(job.coord) {
            Ok(tile) => JobOutcome::Generated {
                coord: job.coord,
                tile: Box::new(tile),
                elapsed: start.elapsed(),
            },
            Err(error) => JobOutcome::Failed {
                coord: job.coord,
                error,
            },
        };
        if results.send(outcome).is_err() {
            return;
        }
    }
}
