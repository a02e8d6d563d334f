// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the shared store.

use std::fmt;

use crate::vector::Orientation;

/// Convenience alias used across the store.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by vector and matrix operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Two-operand operation over vectors of different lengths.
    LengthMismatch { left: usize, right: usize },
    /// Operand carries the wrong orientation for the operation.
    OrientationMismatch {
        expected: Orientation,
        actual: Orientation,
    },
    /// Index past the end of a vector or matrix.
    IndexOutOfBounds { index: usize, len: usize },
    /// Operation requires at least one element.
    EmptyMatrix,
    /// Loader input had rows of differing widths.
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { left, right } => {
                write!(f, "operand lengths differ: {left} vs {right}")
            },
            Self::OrientationMismatch { expected, actual } => {
                write!(f, "expected a {expected} vector, found a {actual} vector")
            },
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            },
            Self::EmptyMatrix => write!(f, "matrix has no elements"),
            Self::RaggedMatrix {
                row,
                expected,
                actual,
            } => {
                write!(f, "row {row} has width {actual}, expected {expected}")
            },
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = StoreError::LengthMismatch { left: 2, right: 3 };
        assert_eq!(err.to_string(), "operand lengths differ: 2 vs 3");

        let err = StoreError::OrientationMismatch {
            expected: Orientation::Row,
            actual: Orientation::Column,
        };
        assert_eq!(err.to_string(), "expected a row vector, found a column vector");

        let err = StoreError::IndexOutOfBounds { index: 4, len: 2 };
        assert_eq!(err.to_string(), "index 4 out of bounds for length 2");
    }
}
