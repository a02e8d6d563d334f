// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tree error types.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors from parsing, validating, or interrogating computation trees.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed computation tree: {0}")]
    Json(#[from] serde_json::Error),

    /// A leaf matrix had rows of differing widths.
    #[error("leaf row {row} has width {actual}, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The node is an operation; only leaves carry a matrix.
    #[error("node is not resolved yet")]
    Unresolved,
}
