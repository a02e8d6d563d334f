// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pool error types.

use thiserror::Error;

/// Convenience alias used across the pool.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors from pool construction and task dispatch.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool needs at least one worker.
    #[error("worker count must be positive, got {0}")]
    InvalidWorkerCount(usize),

    /// The chosen worker stopped accepting tasks.
    #[error("worker {id} is no longer accepting tasks")]
    WorkerStopped { id: usize },

    /// A task in the latest batch panicked; the message is the panic payload.
    #[error("a task panicked: {0}")]
    TaskPanicked(String),
}
