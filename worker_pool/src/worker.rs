// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fatigue-tracking worker threads.
//!
//! A [`Worker`] is one long-lived OS thread behind a single-slot channel. The
//! thread loops: block for the next message, run the task if it got one, fold
//! the elapsed time into its own statistics, go back to waiting. Fatigue
//! accrues as busy milliseconds scaled by the worker's fixed fatigue factor,
//! so a higher factor models a slower processor tiring faster per unit of
//! work. Statistics are mutated only by the worker's own loop; everyone else
//! takes snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{PoolError, Result};

const MILLIS_PER_SECOND: f64 = 1_000.0;

/// A unit of work accepted by a worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum WorkerMessage {
    Run(Task),
    Stop,
}

/// Cumulative execution statistics, owned by the worker loop.
#[derive(Debug, Clone, Default)]
struct WorkerStats {
    fatigue: f64,
    time_used: Duration,
    time_idle: Duration,
}

/// Point-in-time view of one worker, as embedded in the pool report.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    pub id: usize,
    pub fatigue_factor: f64,
    pub fatigue: f64,
    pub time_used: Duration,
    pub time_idle: Duration,
    pub busy: bool,
}

#[derive(Debug)]
pub(crate) struct WorkerState {
    busy: AtomicBool,
    accepting: AtomicBool,
    stats: RwLock<WorkerStats>,
}

impl WorkerState {
    pub(crate) fn fatigue(&self) -> f64 {
        self.stats.read().fatigue
    }
}

/// One long-lived worker thread with a single-slot task handoff.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    fatigue_factor: f64,
    sender: Sender<WorkerMessage>,
    state: Arc<WorkerState>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns the worker thread.
    ///
    /// `fatigue_factor` is fixed for the worker's lifetime.
    #[must_use]
    pub fn spawn(id: usize, fatigue_factor: f64) -> Self {
        let (sender, receiver) = bounded(1);
        let state = Arc::new(WorkerState {
            busy: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
            stats: RwLock::new(WorkerStats::default()),
        });
        let loop_state = Arc::clone(&state);
        let handle = thread::spawn(move || run_loop(&loop_state, fatigue_factor, &receiver));
        Self {
            id,
            fatigue_factor,
            sender,
            state,
            handle: Some(handle),
        }
    }

    /// Hands `task` to the worker.
    ///
    /// Blocks while a previously deposited message has not been picked up.
    /// Fails with [`PoolError::WorkerStopped`] once the worker no longer
    /// accepts work; a task the worker already accepted still runs to
    /// completion.
    pub fn new_task(&self, task: Task) -> Result<()> {
        if !self.state.accepting.load(Ordering::Acquire) {
            return Err(PoolError::WorkerStopped { id: self.id });
        }
        self.sender
            .send(WorkerMessage::Run(task))
            .map_err(|_| PoolError::WorkerStopped { id: self.id })
    }

    /// Marks the worker as no longer accepting and delivers the stop message.
    ///
    /// A running task is never interrupted. The flag flips before the message
    /// is queued, so no new task can land behind the stop in the channel and
    /// be silently dropped.
    pub fn shutdown(&self) {
        self.state.accepting.store(false, Ordering::Release);
        let _ = self.sender.send(WorkerMessage::Stop);
    }

    /// Waits for the worker thread to exit. Idempotent.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn fatigue_factor(&self) -> f64 {
        self.fatigue_factor
    }

    #[must_use]
    pub fn fatigue(&self) -> f64 {
        self.state.stats.read().fatigue
    }

    #[must_use]
    pub fn time_used(&self) -> Duration {
        self.state.stats.read().time_used
    }

    #[must_use]
    pub fn time_idle(&self) -> Duration {
        self.state.stats.read().time_idle
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::Acquire)
    }

    /// Whether the worker thread is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    #[must_use]
    pub fn snapshot(&self) -> WorkerSnapshot {
        let stats = self.state.stats.read();
        WorkerSnapshot {
            id: self.id,
            fatigue_factor: self.fatigue_factor,
            fatigue: stats.fatigue,
            time_used: stats.time_used,
            time_idle: stats.time_idle,
            busy: self.state.busy.load(Ordering::Acquire),
        }
    }

    pub(crate) fn state(&self) -> Arc<WorkerState> {
        Arc::clone(&self.state)
    }
}

fn run_loop(state: &WorkerState, fatigue_factor: f64, receiver: &Receiver<WorkerMessage>) {
    loop {
        let wait_started = Instant::now();
        let message = match receiver.recv() {
            Ok(message) => message,
            // The sender is gone; there is nothing left to wait for.
            Err(_) => break,
        };
        state.stats.write().time_idle += wait_started.elapsed();

        match message {
            WorkerMessage::Run(task) => {
                state.busy.store(true, Ordering::Release);
                let started = Instant::now();
                task();
                let elapsed = started.elapsed();
                {
                    let mut stats = state.stats.write();
                    stats.time_used += elapsed;
                    stats.fatigue += elapsed.as_secs_f64() * MILLIS_PER_SECOND * fatigue_factor;
                }
                state.busy.store(false, Ordering::Release);
            },
            WorkerMessage::Stop => break,
        }
    }
    state.accepting.store(false, Ordering::Release);
}
