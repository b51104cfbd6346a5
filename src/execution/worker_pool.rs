//! Bounded Worker Pool
//!
//! Shared executor for processors that do not bring their own. Admission
//! follows the classic bounded-pool shape: a fixed set of resident workers
//! drains a bounded queue, overflow workers are spawned up to a hard maximum
//! when the queue is full, and submissions beyond that are rejected
//! immediately. Rejection is the backpressure signal the dispatcher maps to
//! `ServerThreadpoolBusy`; the pool never blocks a submitting task and never
//! drops accepted work.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

type Job = BoxFuture<'static, ()>;

/// Worker pool sizing.
///
/// Defaults: 20 resident workers, 400 maximum, a queue of 600 and a
/// 60 second keep-alive for idle overflow workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Resident workers started at construction and kept for the pool's
    /// lifetime.
    pub core_workers: usize,

    /// Hard ceiling on concurrent workers, resident plus overflow.
    pub max_workers: usize,

    /// Bounded queue capacity between submitters and workers.
    pub queue_capacity: usize,

    /// Idle time after which an overflow worker exits.
    pub keep_alive_ms: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            core_workers: 20,
            max_workers: 400,
            queue_capacity: 600,
            keep_alive_ms: 60_000,
        }
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone)]
pub struct WorkerPoolStats {
    pub workers: usize,
    pub active_jobs: usize,
    pub queued_jobs: usize,
    pub submitted_jobs: u64,
    pub completed_jobs: u64,
}

/// Worker pool errors surfaced to the dispatching caller.
#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    #[error("worker pool saturated: {max_workers} workers busy and queue of {queue_capacity} full")]
    Saturated {
        max_workers: usize,
        queue_capacity: usize,
    },

    #[error("worker pool is shut down")]
    ShutDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerRole {
    Resident,
    Overflow,
}

enum Polled {
    Job(Job),
    Closed,
    Idle,
}

/// Bounded multi-worker executor on top of Tokio tasks.
///
/// Must be constructed from within a Tokio runtime; resident workers are
/// spawned immediately.
pub struct WorkerPool {
    tx: mpsc::Sender<Job>,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    config: WorkerPoolConfig,
    worker_count: Arc<AtomicUsize>,
    active_jobs: Arc<AtomicUsize>,
    submitted_jobs: Arc<AtomicU64>,
    completed_jobs: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::with_config(WorkerPoolConfig::default())
    }

    pub fn with_config(config: WorkerPoolConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let pool = Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            config,
            worker_count: Arc::new(AtomicUsize::new(0)),
            active_jobs: Arc::new(AtomicUsize::new(0)),
            submitted_jobs: Arc::new(AtomicU64::new(0)),
            completed_jobs: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            handles: parking_lot::Mutex::new(Vec::new()),
        };
        for _ in 0..pool.config.core_workers {
            pool.worker_count.fetch_add(1, Ordering::AcqRel);
            pool.spawn_worker(WorkerRole::Resident, None);
        }
        debug!(
            "worker pool started: core={}, max={}, queue={}",
            pool.config.core_workers, pool.config.max_workers, pool.config.queue_capacity
        );
        pool
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Submit a job for execution.
    ///
    /// Fails fast with `Saturated` when the queue is full and the worker
    /// ceiling is reached; never blocks the submitting task.
    pub fn try_submit<F>(&self, task: F) -> Result<(), WorkerPoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(WorkerPoolError::ShutDown);
        }
        let job: Job = Box::pin(task);
        match self.tx.try_send(job) {
            Ok(()) => {
                self.submitted_jobs.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(WorkerPoolError::ShutDown),
            Err(mpsc::error::TrySendError::Full(job)) => match self.try_spawn_overflow(job) {
                Ok(()) => {
                    self.submitted_jobs.fetch_add(1, Ordering::AcqRel);
                    Ok(())
                }
                Err(_rejected) => {
                    warn!(
                        "worker pool saturated, rejecting submission: workers={}, queue={}",
                        self.worker_count.load(Ordering::Acquire),
                        self.config.queue_capacity
                    );
                    Err(WorkerPoolError::Saturated {
                        max_workers: self.config.max_workers,
                        queue_capacity: self.config.queue_capacity,
                    })
                }
            },
        }
    }

    /// Graceful shutdown: stop intake and wait for every accepted job to
    /// finish. Idle workers exit on their next keep-alive tick.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        loop {
            let submitted = self.submitted_jobs.load(Ordering::Acquire);
            let completed = self.completed_jobs.load(Ordering::Acquire);
            if completed >= submitted {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        debug!("worker pool drained and shut down");
    }

    /// Immediate shutdown: stop intake and abort workers. Queued jobs are
    /// discarded.
    pub fn shutdown_now(&self) {
        self.closed.store(true, Ordering::Release);
        let mut handles = self.handles.lock();
        for handle in handles.drain(..) {
            handle.abort();
        }
        warn!("worker pool shut down immediately, queued work discarded");
    }

    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            workers: self.worker_count.load(Ordering::Acquire),
            active_jobs: self.active_jobs.load(Ordering::Acquire),
            queued_jobs: self.tx.max_capacity() - self.tx.capacity(),
            submitted_jobs: self.submitted_jobs.load(Ordering::Acquire),
            completed_jobs: self.completed_jobs.load(Ordering::Acquire),
        }
    }

    /// Reserve an overflow worker slot and hand it the job directly,
    /// bypassing the full queue.
    fn try_spawn_overflow(&self, job: Job) -> Result<(), Job> {
        let mut count = self.worker_count.load(Ordering::Acquire);
        loop {
            if count >= self.config.max_workers {
                return Err(job);
            }
            match self.worker_count.compare_exchange(
                count,
                count + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => count = actual,
            }
        }
        self.spawn_worker(WorkerRole::Overflow, Some(job));
        Ok(())
    }

    fn spawn_worker(&self, role: WorkerRole, first_job: Option<Job>) {
        let rx = Arc::clone(&self.rx);
        let worker_count = Arc::clone(&self.worker_count);
        let active_jobs = Arc::clone(&self.active_jobs);
        let completed_jobs = Arc::clone(&self.completed_jobs);
        let closed = Arc::clone(&self.closed);
        let keep_alive = Duration::from_millis(self.config.keep_alive_ms.max(1));

        let handle = tokio::spawn(async move {
            if let Some(job) = first_job {
                run_job(job, &active_jobs, &completed_jobs).await;
            }
            loop {
                // The receiver lock is released before the job runs, so one
                // busy worker never starves the others of the queue.
                let polled = {
                    let mut receiver = rx.lock().await;
                    match timeout(keep_alive, receiver.recv()).await {
                        Ok(Some(job)) => Polled::Job(job),
                        Ok(None) => Polled::Closed,
                        Err(_) => Polled::Idle,
                    }
                };
                match polled {
                    Polled::Job(job) => run_job(job, &active_jobs, &completed_jobs).await,
                    Polled::Closed => break,
                    Polled::Idle => {
                        if role == WorkerRole::Overflow || closed.load(Ordering::Acquire) {
                            break;
                        }
                    }
                }
            }
            worker_count.fetch_sub(1, Ordering::AcqRel);
        });

        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job(job: Job, active_jobs: &AtomicUsize, completed_jobs: &AtomicU64) {
    active_jobs.fetch_add(1, Ordering::AcqRel);
    if std::panic::AssertUnwindSafe(job).catch_unwind().await.is_err() {
        warn!("worker job panicked");
    }
    active_jobs.fetch_sub(1, Ordering::AcqRel);
    completed_jobs.fetch_add(1, Ordering::AcqRel);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Semaphore;
    use tokio_test::assert_ok;

    fn small_config() -> WorkerPoolConfig {
        WorkerPoolConfig {
            core_workers: 1,
            max_workers: 2,
            queue_capacity: 1,
            keep_alive_ms: 60_000,
        }
    }

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached in time"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_executes_submitted_jobs() {
        let pool = WorkerPool::with_config(WorkerPoolConfig {
            core_workers: 2,
            max_workers: 4,
            queue_capacity: 16,
            keep_alive_ms: 60_000,
        });
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            assert_ok!(pool.try_submit(async move {
                counter.fetch_add(1, Ordering::AcqRel);
            }));
        }

        wait_until(|| counter.load(Ordering::Acquire) == 5).await;
    }

    #[tokio::test]
    async fn test_oversubmission_is_rejected_not_dropped() {
        let pool = WorkerPool::with_config(small_config());
        let gate = Arc::new(Semaphore::new(0));

        let mut accepted = 0u64;
        let mut rejected = 0u64;
        for _ in 0..6 {
            let gate = Arc::clone(&gate);
            match pool.try_submit(async move {
                let _permit = gate.acquire().await;
            }) {
                Ok(()) => accepted += 1,
                Err(WorkerPoolError::Saturated { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // Capacity is at most max workers plus the queue.
        assert!(accepted <= 3, "accepted {accepted} jobs");
        assert!(rejected >= 3, "rejected only {rejected} jobs");
        assert_eq!(accepted + rejected, 6);

        // Every accepted job still runs to completion once unblocked.
        gate.add_permits(16);
        wait_until(|| pool.stats().completed_jobs == accepted).await;
    }

    #[tokio::test]
    async fn test_overflow_worker_expires_after_keep_alive() {
        let pool = WorkerPool::with_config(WorkerPoolConfig {
            core_workers: 1,
            max_workers: 2,
            queue_capacity: 1,
            keep_alive_ms: 50,
        });
        let gate = Arc::new(Semaphore::new(0));

        // One job occupies the resident worker, one sits in the queue, the
        // third forces an overflow worker.
        for _ in 0..3 {
            let gate = Arc::clone(&gate);
            let _ = pool.try_submit(async move {
                let _permit = gate.acquire().await;
            });
        }
        assert_eq!(pool.stats().workers, 2);

        gate.add_permits(16);
        wait_until(|| pool.stats().active_jobs == 0).await;
        wait_until(|| pool.stats().workers == 1).await;
    }

    #[tokio::test]
    async fn test_graceful_shutdown_completes_accepted_work() {
        let pool = WorkerPool::with_config(WorkerPoolConfig {
            core_workers: 2,
            max_workers: 4,
            queue_capacity: 8,
            keep_alive_ms: 50,
        });
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let counter = Arc::clone(&counter);
            assert_ok!(pool.try_submit(async move {
                counter.fetch_add(1, Ordering::AcqRel);
            }));
        }

        pool.shutdown().await;
        assert_eq!(counter.load(Ordering::Acquire), 6);
        assert!(matches!(
            pool.try_submit(async {}),
            Err(WorkerPoolError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_now_stops_intake() {
        let pool = WorkerPool::with_config(small_config());
        pool.shutdown_now();
        assert!(matches!(
            pool.try_submit(async {}),
            Err(WorkerPoolError::ShutDown)
        ));
    }
}
