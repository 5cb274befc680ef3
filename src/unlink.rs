//! Filepath: src/unlink.rs
//!
//! Task orchestration for deferred physical unlinking.
//!
//! Writers only delete logically; the physical relink of predecessor
//! pointers runs as a background job so writer critical sections stay
//! short. The orchestrator is an injected collaborator with a single
//! `run` method, so tests can execute jobs inline and deployments can
//! route them onto an existing worker pool.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::error::Error;

/// A deferred unit of work handed to an [`Orchestrator`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes deferred jobs on behalf of the queue.
///
/// Implementations may use a dedicated thread, a pool, or run the job on
/// the calling thread. Jobs are independent and idempotent; an
/// orchestrator that drops queued jobs on shutdown leaves the list
/// logically consistent (still-linked nodes are freed when the list
/// drops).
pub trait Orchestrator: Send + Sync + 'static {
    /// Execute `job`, now or later, on any thread.
    fn run(&self, job: Job);
}

// ============================================================================
//  InlineOrchestrator
// ============================================================================

/// Runs every job on the calling thread, synchronously.
///
/// Intended for tests and single-threaded embeddings where deterministic
/// unlinking matters more than writer latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineOrchestrator;

impl Orchestrator for InlineOrchestrator {
    fn run(&self, job: Job) {
        job();
    }
}

// ============================================================================
//  BackgroundOrchestrator
// ============================================================================

struct OrchestratorShared {
    queue: Mutex<VecDeque<Job>>,
    available: Condvar,
    shutdown: AtomicBool,
}

/// A single dedicated worker thread draining a FIFO job queue.
///
/// This is the default orchestrator. Dropping it signals shutdown, lets
/// the worker drain whatever is already queued, and joins it; jobs
/// submitted after shutdown run inline on the caller.
pub struct BackgroundOrchestrator {
    shared: Arc<OrchestratorShared>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundOrchestrator {
    /// Spawn the worker thread.
    #[must_use]
    pub fn new() -> Self {
        let shared = Arc::new(OrchestratorShared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("skipq-unlink".to_owned())
            .spawn(move || Self::worker_loop(&worker_shared))
            .ok();

        Self { shared, worker }
    }

    fn worker_loop(shared: &OrchestratorShared) {
        loop {
            let job: Job = {
                let mut queue = shared.queue.lock();
                loop {
                    if let Some(job) = queue.pop_front() {
                        break job;
                    }
                    if shared.shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    shared.available.wait(&mut queue);
                }
            };

            job();
        }
    }

    /// Jobs waiting to run. Loosely consistent; useful in tests.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

impl Default for BackgroundOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator for BackgroundOrchestrator {
    fn run(&self, job: Job) {
        if self.shared.shutdown.load(Ordering::Acquire) || self.worker.is_none() {
            // Worker is gone (shutdown, or spawn failed at startup); run
            // inline rather than lose the job.
            job();
            return;
        }

        self.shared.queue.lock().push_back(job);
        self.shared.available.notify_one();
    }
}

impl Drop for BackgroundOrchestrator {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.available.notify_all();

        if let Some(worker) = self.worker.take() {
            // The last queue handle can be dropped from inside a job, in
            // which case this Drop runs on the worker itself: detach
            // instead of self-joining.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl std::fmt::Debug for BackgroundOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundOrchestrator")
            .field("backlog", &self.backlog())
            .field(
                "shutdown",
                &self.shared.shutdown.load(Ordering::Relaxed),
            )
            .finish()
    }
}

// ============================================================================
//  Health
// ============================================================================

/// Aggregated health of background unlinking.
///
/// A panicking job is caught at the job boundary and recorded here; the
/// list itself stays logically consistent, but physical unlinking of the
/// affected node may be stalled until the list drops.
#[derive(Debug, Default)]
pub(crate) struct Health {
    failed: AtomicBool,
    failures: AtomicUsize,
}

impl Health {
    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.failed.store(true, Ordering::Release);
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        if self.failed.load(Ordering::Acquire) {
            Err(Error::OrchestratorFailed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

// ============================================================================
//  Tests
// ============================================================================
