// SPDX-License-Identifier: MIT OR Apache-2.0

//! Least-fatigued-first dispatch over a fixed set of workers.
//!
//! The pool keeps every idle worker in a min-heap keyed by the fatigue
//! snapshot taken when the worker went idle, and an `in_flight` count of
//! accepted-but-unfinished tasks under the same mutex. [`WorkerPool::submit`]
//! blocks until some worker is idle, pops the least-fatigued one, and wraps
//! the task so that the worker re-enters the heap and the count drops on
//! every exit path, panics included. [`WorkerPool::submit_all`] is the
//! fork-join barrier: it returns once `in_flight` is back to zero, then
//! re-raises the first panic recorded for the batch.

use std::any::Any;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use serde::Serialize;

use crate::error::{PoolError, Result};
use crate::worker::{Task, Worker, WorkerSnapshot};

/// Fatigue factors are drawn uniformly from this half-open range.
pub const FATIGUE_FACTOR_MIN: f64 = 0.5;
pub const FATIGUE_FACTOR_MAX: f64 = 1.5;

/// Idle-heap entry; the fatigue key is snapshotted when the worker goes idle.
#[derive(Debug, Clone, Copy)]
struct IdleEntry {
    fatigue: f64,
    worker: usize,
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    // `BinaryHeap` is a max-heap; reversed comparisons make the least
    // fatigued worker pop first, lowest id breaking ties.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .fatigue
            .total_cmp(&self.fatigue)
            .then_with(|| other.worker.cmp(&self.worker))
    }
}

struct PoolInner {
    idle: BinaryHeap<IdleEntry>,
    in_flight: usize,
    failure: Option<String>,
}

struct PoolShared {
    inner: Mutex<PoolInner>,
    worker_idle: Condvar,
    drained: Condvar,
}

/// A fixed pool dispatching each task to the least-fatigued idle worker.
pub struct WorkerPool {
    workers: Vec<Worker>,
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Spawns `count` workers, each with an independently random fatigue
    /// factor, all idle at fatigue zero.
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(PoolError::InvalidWorkerCount(count));
        }

        let mut rng = rand::rng();
        let workers: Vec<Worker> = (0..count)
            .map(|id| Worker::spawn(id, rng.random_range(FATIGUE_FACTOR_MIN..FATIGUE_FACTOR_MAX)))
            .collect();

        let mut idle = BinaryHeap::with_capacity(workers.len());
        for worker in &workers {
            idle.push(IdleEntry {
                fatigue: worker.fatigue(),
                worker: worker.id(),
            });
        }

        tracing::debug!(workers = count, "worker pool started");
        Ok(Self {
            workers,
            shared: Arc::new(PoolShared {
                inner: Mutex::new(PoolInner {
                    idle,
                    in_flight: 0,
                    failure: None,
                }),
                worker_idle: Condvar::new(),
                drained: Condvar::new(),
            }),
        })
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Dispatches one task to the least-fatigued idle worker.
    ///
    /// Blocks until a worker is idle. The task is wrapped so the worker
    /// re-enters the idle heap and `in_flight` drops on every exit path; a
    /// panic inside the task is recorded and surfaces at the next barrier.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let entry = {
            let mut inner = self.shared.inner.lock();
            loop {
                if let Some(entry) = inner.idle.pop() {
                    inner.in_flight += 1;
                    break entry;
                }
                self.shared.worker_idle.wait(&mut inner);
            }
        };

        let worker = &self.workers[entry.worker];
        let state = worker.state();
        let shared = Arc::clone(&self.shared);
        let worker_id = entry.worker;
        let wrapped: Task = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            let mut inner = shared.inner.lock();
            inner.idle.push(IdleEntry {
                fatigue: state.fatigue(),
                worker: worker_id,
            });
            inner.in_flight -= 1;
            if let Err(payload) = outcome {
                if inner.failure.is_none() {
                    inner.failure = Some(panic_message(payload.as_ref()));
                }
            }
            let drained_now = inner.in_flight == 0;
            drop(inner);
            if drained_now {
                shared.drained.notify_all();
            }
            shared.worker_idle.notify_one();
        });

        if let Err(rejection) = worker.new_task(wrapped) {
            self.restore_after_rejection(entry);
            return Err(rejection);
        }
        Ok(())
    }

    /// Submits every task in order, then blocks until the whole batch has
    /// finished.
    ///
    /// Submission itself provides the backpressure: at most `worker_count()`
    /// tasks are ever in flight. After the barrier, the first panic recorded
    /// for the batch is re-raised as [`PoolError::TaskPanicked`]. An empty
    /// batch returns immediately.
    pub fn submit_all<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: FnOnce() + Send + 'static,
    {
        for task in tasks {
            self.submit(task)?;
        }
        self.wait_drained()
    }

    /// Blocks until in-flight work drains, then stops and joins every worker.
    ///
    /// Idempotent; also runs on drop. No worker thread survives this call.
    pub fn shutdown(&mut self) {
        {
            let mut inner = self.shared.inner.lock();
            while inner.in_flight > 0 {
                self.shared.drained.wait(&mut inner);
            }
        }
        tracing::debug!(workers = self.workers.len(), "shutting down worker pool");
        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &mut self.workers {
            worker.join();
        }
    }

    /// Snapshot of every worker plus the fairness score.
    #[must_use]
    pub fn report(&self) -> PoolReport {
        let workers: Vec<WorkerSnapshot> = self.workers.iter().map(Worker::snapshot).collect();
        let fairness = fairness_score(&workers);
        PoolReport { workers, fairness }
    }

    fn wait_drained(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        while inner.in_flight > 0 {
            self.shared.drained.wait(&mut inner);
        }
        match inner.failure.take() {
            Some(message) => Err(PoolError::TaskPanicked(message)),
            None => Ok(()),
        }
    }

    fn restore_after_rejection(&self, entry: IdleEntry) {
        let mut inner = self.shared.inner.lock();
        inner.idle.push(entry);
        inner.in_flight -= 1;
        let drained_now = inner.in_flight == 0;
        drop(inner);
        if drained_now {
            self.shared.drained.notify_all();
        }
        self.shared.worker_idle.notify_one();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Serializable summary of pool activity; `Display` renders the report text.
#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub workers: Vec<WorkerSnapshot>,
    /// Sum of squared deviations of worker fatigue from the mean; lower is
    /// more even.
    pub fairness: f64,
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============== WORKER REPORT ==============")?;
        for worker in &self.workers {
            writeln!(
                f,
                "Worker #{} | Fatigue: {:.6} | Work Time: {:.3} ms | Idle Time: {:.3} ms",
                worker.id,
                worker.fatigue,
                worker.time_used.as_secs_f64() * 1_000.0,
                worker.time_idle.as_secs_f64() * 1_000.0,
            )?;
        }
        writeln!(f, "-------------------------------------------")?;
        writeln!(
            f,
            "Fairness (Sum of Squared Deviations): {:.6}",
            self.fairness
        )?;
        write!(f, "===========================================")
    }
}

fn fairness_score(workers: &[WorkerSnapshot]) -> f64 {
    if workers.is_empty() {
        return 0.0;
    }
    let mean = workers.iter().map(|w| w.fatigue).sum::<f64>() / workers.len() as f64;
    workers.iter().map(|w| (w.fatigue - mean).powi(2)).sum()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn counting_tasks(counter: &Arc<AtomicUsize>, count: usize) -> Vec<Task> {
        (0..count)
            .map(|_| {
                let counter = Arc::clone(counter);
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Task
            })
            .collect()
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(PoolError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn test_heap_prefers_lower_fatigue_then_lower_id() {
        let mut heap = BinaryHeap::new();
        heap.push(IdleEntry { fatigue: 2.0, worker: 0 });
        heap.push(IdleEntry { fatigue: 1.0, worker: 5 });
        heap.push(IdleEntry { fatigue: 1.0, worker: 2 });

        assert_eq!(heap.pop().map(|e| e.worker), Some(2));
        assert_eq!(heap.pop().map(|e| e.worker), Some(5));
        assert_eq!(heap.pop().map(|e| e.worker), Some(0));
    }

    #[test]
    fn test_submit_all_is_a_barrier() {
        let mut pool = WorkerPool::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit_all(counting_tasks(&counter, 50)).unwrap();
        // The barrier already passed; no polling is needed.
        assert_eq!(counter.load(Ordering::SeqCst), 50);
        pool.shutdown();
    }

    #[test]
    fn test_submit_all_empty_batch_returns_immediately() {
        let pool = WorkerPool::new(2).unwrap();
        pool.submit_all(Vec::<Task>::new()).unwrap();
    }

    #[test]
    fn test_single_task() {
        let pool = WorkerPool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit_all(counting_tasks(&counter, 1)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_batches() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for round in 1..=3 {
            pool.submit_all(counting_tasks(&counter, 10)).unwrap();
            assert_eq!(counter.load(Ordering::SeqCst), round * 10);
        }
    }

    #[test]
    fn test_barrier_waits_for_slow_tasks() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<Task> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                Box::new(move || {
                    thread::sleep(Duration::from_millis(20));
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Task
            })
            .collect();

        pool.submit_all(tasks).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_shutdown_without_tasks() {
        let mut pool = WorkerPool::new(3).unwrap();
        pool.shutdown();
        assert!(pool.workers.iter().all(|w| !w.is_alive()));
    }

    #[test]
    fn test_shutdown_after_tasks_stops_every_worker() {
        let mut pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit_all(counting_tasks(&counter, 20)).unwrap();
        pool.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert!(pool.workers.iter().all(|w| !w.is_alive()));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut pool = WorkerPool::new(2).unwrap();
        pool.shutdown();
        pool.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut pool = WorkerPool::new(2).unwrap();
        pool.shutdown();
        let result = pool.submit(|| {});
        assert!(matches!(result, Err(PoolError::WorkerStopped { .. })));
    }

    #[test]
    fn test_panic_is_reraised_after_the_barrier() {
        let pool = WorkerPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let mut tasks = counting_tasks(&counter, 2);
        tasks.insert(1, Box::new(|| panic!("boom")) as Task);

        let result = pool.submit_all(tasks);
        match result {
            Err(PoolError::TaskPanicked(message)) => assert_eq!(message, "boom"),
            other => panic!("expected TaskPanicked, got {other:?}"),
        }
        // The two well-behaved tasks still ran to completion.
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        // The pool stays usable after a failed batch.
        pool.submit_all(counting_tasks(&counter, 5)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_report_covers_every_worker() {
        let pool = WorkerPool::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit_all(counting_tasks(&counter, 9)).unwrap();

        let report = pool.report();
        assert_eq!(report.workers.len(), 3);
        assert!(report.fairness >= 0.0);
        for (id, snapshot) in report.workers.iter().enumerate() {
            assert_eq!(snapshot.id, id);
            assert!(snapshot.fatigue_factor >= FATIGUE_FACTOR_MIN);
            assert!(snapshot.fatigue_factor < FATIGUE_FACTOR_MAX);
        }

        let rendered = report.to_string();
        assert!(rendered.contains("WORKER REPORT"));
        assert!(rendered.contains("Worker #0"));
        assert!(rendered.contains("Fairness"));
    }
}
