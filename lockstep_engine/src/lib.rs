// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Lockstep orchestrator.
//!
//! The engine walks a computation tree bottom-up: it finds the next node
//! whose children are all resolved, stages the operand matrices into two
//! reusable [`SharedMatrix`] buffers, decomposes the node into one task per
//! row of the left operand, runs the whole wave through the pool's
//! fork-join barrier, then reads the result back and folds it into the tree
//! as a resolved leaf. One node, one wave, one barrier; waves never overlap.
//!
//! # Validation
//!
//! Arity and shape are checked before any task is queued, so invalid trees
//! fail fast on the caller's thread. Errors raised inside a task (a mutation
//! racing a reload, in principle unreachable through this engine) are
//! captured into a per-wave slot and re-raised after the barrier.
//!
//! # Thread Safety
//!
//! The engine itself is single-threaded; only row tasks run in parallel.
//! Staging buffers are reused across waves, which is safe because a wave's
//! barrier completes before the next load.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use compute_tree::{ComputationNode, Operator, TreeError};
use matrix_store::{SharedMatrix, StoreError};
use worker_pool::{PoolError, PoolReport, Task, WorkerPool};

/// Convenience alias used across the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors from tree evaluation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operator applied to the wrong number of children.
    #[error("{op} expects {expected} operand(s), found {actual}")]
    WrongOperandCount {
        op: Operator,
        expected: usize,
        actual: usize,
    },

    /// Addition operands disagree on row count.
    #[error("add operands have {left} and {right} rows")]
    RowCountMismatch { left: usize, right: usize },

    /// Addition operands disagree on row width.
    #[error("add operands have rows of width {left} and {right}")]
    RowWidthMismatch { left: usize, right: usize },

    /// Multiplication operands disagree on the inner dimension.
    #[error("cannot multiply: left has {left_cols} columns, right has {right_rows} rows")]
    InnerDimensionMismatch { left_cols: usize, right_rows: usize },

    /// The node offered for computation is already a resolved leaf.
    #[error("node is already resolved")]
    NothingToCompute,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Evaluates matrix computation trees in barrier-synchronized waves.
pub struct LockstepEngine {
    left: SharedMatrix,
    right: Arc<SharedMatrix>,
    pool: WorkerPool,
}

impl LockstepEngine {
    /// Builds an engine over `workers` pool threads.
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self {
            left: SharedMatrix::new(),
            right: Arc::new(SharedMatrix::new()),
            pool: WorkerPool::new(workers)?,
        })
    }

    /// Resolves `root` to a single leaf and returns it.
    ///
    /// The pool shuts down before this returns, success or failure, so no
    /// worker threads outlive the run. The engine is single-shot: a later
    /// run needing computation fails with the pool's rejection.
    pub fn run(&mut self, mut root: ComputationNode) -> Result<ComputationNode> {
        root.associative_flatten();
        let outcome = self.resolve_tree(&mut root);
        self.pool.shutdown();
        outcome.map(|()| root)
    }

    /// Worker statistics; available before and after `run`.
    #[must_use]
    pub fn worker_report(&self) -> PoolReport {
        self.pool.report()
    }

    fn resolve_tree(&mut self, root: &mut ComputationNode) -> Result<()> {
        while let Some(node) = root.find_next_resolvable() {
            self.compute_node(node)?;
        }
        Ok(())
    }

    /// Computes one operation node whose children are all resolved leaves.
    fn compute_node(&mut self, node: &mut ComputationNode) -> Result<()> {
        let ComputationNode::Operation { op, children } = &*node else {
            return Err(EngineError::NothingToCompute);
        };
        let op = *op;
        if children.len() != op.arity() {
            return Err(EngineError::WrongOperandCount {
                op,
                expected: op.arity(),
                actual: children.len(),
            });
        }

        self.left.load_row_major(children[0].matrix()?)?;

        let failure = Arc::new(Mutex::new(None));
        let tasks = match op {
            Operator::Add => {
                self.right.load_row_major(children[1].matrix()?)?;
                self.add_tasks(&failure)?
            },
            Operator::Multiply => {
                self.right.load_column_major(children[1].matrix()?)?;
                self.multiply_tasks(&failure)?
            },
            Operator::Negate => self.negate_tasks()?,
            Operator::Transpose => self.transpose_tasks()?,
        };

        tracing::debug!(%op, rows = self.left.len(), "dispatching wave");
        self.pool.submit_all(tasks)?;
        if let Some(error) = failure.lock().take() {
            return Err(EngineError::Store(error));
        }

        node.resolve(self.left.read_row_major());
        Ok(())
    }

    fn add_tasks(&self, failure: &Arc<Mutex<Option<StoreError>>>) -> Result<Vec<Task>> {
        if self.left.len() != self.right.len() {
            return Err(EngineError::RowCountMismatch {
                left: self.left.len(),
                right: self.right.len(),
            });
        }
        if let (Ok(left_row), Ok(right_row)) = (self.left.get(0), self.right.get(0)) {
            if left_row.len() != right_row.len() {
                return Err(EngineError::RowWidthMismatch {
                    left: left_row.len(),
                    right: right_row.len(),
                });
            }
        }

        let mut tasks: Vec<Task> = Vec::with_capacity(self.left.len());
        for i in 0..self.left.len() {
            let target = self.left.get(i)?;
            let operand = self.right.get(i)?;
            let failure = Arc::clone(failure);
            tasks.push(Box::new(move || {
                if let Err(error) = target.add(&operand) {
                    record_failure(&failure, error);
                }
            }));
        }
        Ok(tasks)
    }

    fn multiply_tasks(&self, failure: &Arc<Mutex<Option<StoreError>>>) -> Result<Vec<Task>> {
        let Ok(first_row) = self.left.get(0) else {
            // An empty left operand multiplies into an empty result.
            return Ok(Vec::new());
        };
        let right_rows = match self.right.get(0) {
            Ok(column) => column.len(),
            Err(_) => 0,
        };
        if right_rows == 0 {
            return Err(EngineError::Store(StoreError::EmptyMatrix));
        }
        if first_row.len() != right_rows {
            return Err(EngineError::InnerDimensionMismatch {
                left_cols: first_row.len(),
                right_rows,
            });
        }

        let mut tasks: Vec<Task> = Vec::with_capacity(self.left.len());
        for i in 0..self.left.len() {
            let row = self.left.get(i)?;
            let columns = Arc::clone(&self.right);
            let failure = Arc::clone(failure);
            tasks.push(Box::new(move || {
                if let Err(error) = row.mul_matrix(&columns) {
                    record_failure(&failure, error);
                }
            }));
        }
        Ok(tasks)
    }

    fn negate_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = Vec::with_capacity(self.left.len());
        for i in 0..self.left.len() {
            let row = self.left.get(i)?;
            tasks.push(Box::new(move || row.negate()));
        }
        Ok(tasks)
    }

    fn transpose_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = Vec::with_capacity(self.left.len());
        for i in 0..self.left.len() {
            let row = self.left.get(i)?;
            tasks.push(Box::new(move || row.transpose()));
        }
        Ok(tasks)
    }
}

fn record_failure(slot: &Mutex<Option<StoreError>>, error: StoreError) {
    let mut slot = slot.lock();
    if slot.is_none() {
        *slot = Some(error);
    }
}
