//! Background scoring for interactive front ends.
//!
//! Requests are handed to a single worker thread. The most recent request
//! always wins: requests still queued when a newer one arrives are skipped,
//! and a request that finishes after a newer one was submitted is reported as
//! [`Outcome::Superseded`] instead of carrying a score.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::error::{Error, Result};
use crate::pipeline::QualityScorer;

/// Identifier handed out by [`ScoringService::submit`]. Increases with every request.
pub type RequestId = u64;

/// What became of a request.
#[derive(Debug)]
pub enum Outcome {
    Scored(f64),
    Failed(Error),
    /// A newer request was submitted before this one completed.
    Superseded,
}

/// Completion notice for a submitted request.
#[derive(Debug)]
pub struct ScoreEvent {
    pub id: RequestId,
    pub path: PathBuf,
    pub outcome: Outcome,
}

struct Job {
    id: RequestId,
    path: PathBuf,
}

/// A worker thread that scores images on request.
pub struct ScoringService {
    jobs: Option<Sender<Job>>,
    events: Receiver<ScoreEvent>,
    latest: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl ScoringService {
    /// Start the worker thread. The scorer moves onto it.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(scorer: QualityScorer) -> Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let latest = Arc::new(AtomicU64::new(0));

        let worker_latest = Arc::clone(&latest);
        let worker = thread::Builder::new()
            .name("brisque-scorer".to_string())
            .spawn(move || run_worker(&scorer, &job_rx, &event_tx, &worker_latest))?;

        Ok(Self {
            jobs: Some(job_tx),
            events: event_rx,
            latest,
            worker: Some(worker),
        })
    }

    /// Queue an image for scoring, superseding every earlier request.
    pub fn submit<P: Into<PathBuf>>(&self, path: P) -> RequestId {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let job = Job {
            id,
            path: path.into(),
        };

        if let Some(jobs) = &self.jobs {
            if jobs.send(job).is_err() {
                tracing::warn!("Scoring worker is gone; request {id} dropped");
            }
        }

        id
    }

    /// The most recently submitted request, if any.
    #[must_use]
    pub fn latest(&self) -> Option<RequestId> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }

    /// Next completion notice, without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<ScoreEvent> {
        self.events.try_recv().ok()
    }

    /// Next completion notice, waiting at most `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ScoreEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}

impl Drop for ScoringService {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Scoring worker panicked");
            }
        }
    }
}

fn run_worker(
    scorer: &QualityScorer,
    jobs: &Receiver<Job>,
    events: &Sender<ScoreEvent>,
    latest: &AtomicU64,
) {
    while let Ok(mut job) = jobs.recv() {
        // Skip anything that was overtaken while queued.
        while let Ok(newer) = jobs.try_recv() {
            let skipped = std::mem::replace(&mut job, newer);
            tracing::debug!("Request {} superseded before start", skipped.id);
            if !send(events, skipped, Outcome::Superseded) {
                return;
            }
        }

        let result = scorer.score_path(&job.path);

        let outcome = if latest.load(Ordering::SeqCst) == job.id {
            match result {
                Ok(score) => Outcome::Scored(score),
                Err(err) => Outcome::Failed(err),
            }
        } else {
            tracing::debug!("Request {} superseded while scoring", job.id);
            Outcome::Superseded
        };

        if !send(events, job, outcome) {
            return;
        }
    }
}

fn send(events: &Sender<ScoreEvent>, job: Job, outcome: Outcome) -> bool {
    events
        .send(ScoreEvent {
            id: job.id,
            path: job.path,
            outcome,
        })
        .is_ok()
}
