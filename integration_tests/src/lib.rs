// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for the workspace integration tests.
//!
//! Keeps the test files focused on the scenario under test: tree builders
//! for common matrix shapes and a one-call evaluator that runs a tree on a
//! fresh engine and hands back the resolved rows.

use compute_tree::ComputationNode;
use lockstep_engine::LockstepEngine;

/// Builds an `n` by `n` identity matrix leaf.
pub fn identity(n: usize) -> ComputationNode {
    let rows = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    ComputationNode::leaf(rows)
}

/// Builds a `rows` by `cols` matrix leaf with every cell set to `value`.
pub fn filled(rows: usize, cols: usize, value: f64) -> ComputationNode {
    ComputationNode::leaf(vec![vec![value; cols]; rows])
}

/// Evaluates `root` on a fresh engine backed by `workers` workers and
/// returns the resolved rows.
pub fn evaluate(
    workers: usize,
    root: ComputationNode,
) -> lockstep_engine::Result<Vec<Vec<f64>>> {
    let mut engine = LockstepEngine::new(workers)?;
    let resolved = engine.run(root)?;
    Ok(resolved.matrix()?.to_vec())
}
