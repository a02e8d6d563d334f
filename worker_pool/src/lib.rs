// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fatigue-balanced worker pool with synchronous batch barriers.
//!
//! The pool models a set of unevenly capable processors: each worker carries a
//! fixed random fatigue factor, accrues fatigue in proportion to the time it
//! spends executing, and the pool always hands the next task to the
//! least-fatigued worker that is currently idle. Batches submitted through
//! [`WorkerPool::submit_all`] form a fork-join barrier: the call returns only
//! once every task in the batch has finished.
//!
//! # Design Philosophy
//!
//! - **Message-passing lifecycle.** Each worker owns one OS thread and one
//!   single-slot channel carrying either a task or a stop message; shutdown is
//!   cooperative and never interrupts a task that already started.
//! - **Bookkeeping survives failure.** Task bodies run under `catch_unwind`;
//!   a panic is recorded and re-raised after the barrier, and the worker
//!   re-enters the idle heap either way. A failed task can never wedge the
//!   barrier count.
//! - **Observability over control.** Fatigue and timing feed dispatch and the
//!   worker report; nothing else reads them.

pub mod error;
pub mod pool;
pub mod worker;

pub use error::{PoolError, Result};
pub use pool::{PoolReport, WorkerPool, FATIGUE_FACTOR_MAX, FATIGUE_FACTOR_MIN};
pub use worker::{Task, Worker, WorkerSnapshot};
