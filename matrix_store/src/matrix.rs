// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared matrices: ordered collections of same-orientation vectors.
//!
//! A [`SharedMatrix`] never mutates rows element-by-element itself. Loading
//! replaces the whole backing sequence under a brief exclusive lock, and every
//! other access goes through the contained vectors' own locks. Handles cloned
//! out before a load keep seeing the rows they were cloned from.
//!
//! Rectangularity (equal row widths, uniform orientation) is enforced at load
//! time and preserved by construction; it is not continuously re-checked.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::vector::{Orientation, SharedVector};

/// An ordered, concurrently mutable collection of [`SharedVector`]s.
#[derive(Debug, Default)]
pub struct SharedMatrix {
    vectors: RwLock<Vec<Arc<SharedVector>>>,
}

impl SharedMatrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(Vec::new()),
        }
    }

    /// Builds a matrix directly from row-major data.
    pub fn from_rows(data: &[Vec<f64>]) -> Result<Self> {
        let matrix = Self::new();
        matrix.load_row_major(data)?;
        Ok(matrix)
    }

    /// Replaces the contents with one row vector per input row.
    pub fn load_row_major(&self, data: &[Vec<f64>]) -> Result<()> {
        validate_rectangular(data)?;
        let rows = data
            .iter()
            .map(|row| Arc::new(SharedVector::new(row.clone(), Orientation::Row)))
            .collect();
        *self.vectors.write() = rows;
        Ok(())
    }

    /// Replaces the contents with one column vector per input column.
    ///
    /// Input is still row-major 2-D data; this load transposes it into
    /// column-oriented vectors.
    pub fn load_column_major(&self, data: &[Vec<f64>]) -> Result<()> {
        validate_rectangular(data)?;
        let columns = match data.first() {
            None => Vec::new(),
            Some(first) => (0..first.len())
                .map(|j| {
                    let column: Vec<f64> = data.iter().map(|row| row[j]).collect();
                    Arc::new(SharedVector::new(column, Orientation::Column))
                })
                .collect(),
        };
        *self.vectors.write() = columns;
        Ok(())
    }

    /// Shared handle to the vector at `index`.
    ///
    /// No data lock is taken; the caller goes through the vector's own
    /// locking contract before reading or mutating.
    pub fn get(&self, index: usize) -> Result<Arc<SharedVector>> {
        let vectors = self.vectors.read();
        vectors
            .get(index)
            .cloned()
            .ok_or(StoreError::IndexOutOfBounds {
                index,
                len: vectors.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }

    /// Orientation shared by every contained vector.
    pub fn orientation(&self) -> Result<Orientation> {
        let vectors = self.vectors.read();
        match vectors.first() {
            Some(vector) => Ok(vector.orientation()),
            None => Err(StoreError::EmptyMatrix),
        }
    }

    /// Reassembles the full contents as row-major 2-D data.
    ///
    /// Snapshots the backing sequence, then holds every vector's shared lock
    /// in ascending index order until the copy completes, so the result is a
    /// consistent cut even while rows are being mutated. Column-oriented
    /// contents are reinterpreted: vector `i` becomes column `i` of the
    /// result.
    #[must_use]
    pub fn read_row_major(&self) -> Vec<Vec<f64>> {
        let snapshot = self.vectors.read().clone();
        if snapshot.is_empty() {
            return Vec::new();
        }

        let guards: Vec<_> = snapshot.iter().map(|vector| vector.read()).collect();
        match guards[0].orientation {
            Orientation::Row => guards.iter().map(|guard| guard.values.clone()).collect(),
            Orientation::Column => {
                let height = guards[0].values.len();
                (0..height)
                    .map(|i| guards.iter().map(|guard| guard.values[i]).collect())
                    .collect()
            },
        }
    }

    /// Stable snapshot of the backing sequence.
    pub(crate) fn vectors(&self) -> Vec<Arc<SharedVector>> {
        self.vectors.read().clone()
    }
}

fn validate_rectangular(data: &[Vec<f64>]) -> Result<()> {
    let Some(first) = data.first() else {
        return Ok(());
    };
    let expected = first.len();
    for (row, values) in data.iter().enumerate().skip(1) {
        if values.len() != expected {
            return Err(StoreError::RaggedMatrix {
                row,
                expected,
                actual: values.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_row_major_round_trip() {
        let data = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let matrix = SharedMatrix::from_rows(&data).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.orientation().unwrap(), Orientation::Row);
        assert_eq!(matrix.read_row_major(), data);
    }

    #[test]
    fn test_column_major_loading() {
        let matrix = SharedMatrix::new();
        matrix
            .load_column_major(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .unwrap();

        // One vector per input column.
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.orientation().unwrap(), Orientation::Column);
        let first = matrix.get(0).unwrap();
        assert_eq!(first.get(0).unwrap(), 1.0);
        assert_eq!(first.get(1).unwrap(), 3.0);
        assert_eq!(first.get(2).unwrap(), 5.0);
    }

    #[test]
    fn test_column_major_read_back_round_trip() {
        let data = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let matrix = SharedMatrix::new();
        matrix.load_column_major(&data).unwrap();
        assert_eq!(matrix.read_row_major(), data);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = SharedMatrix::new();
        assert_eq!(matrix.len(), 0);
        assert!(matrix.is_empty());
        assert!(matrix.read_row_major().is_empty());
        assert_eq!(matrix.orientation(), Err(StoreError::EmptyMatrix));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let matrix = SharedMatrix::from_rows(&[vec![1.0]]).unwrap();
        assert!(matches!(
            matrix.get(1),
            Err(StoreError::IndexOutOfBounds { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_ragged_input_rejected() {
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        let matrix = SharedMatrix::new();
        assert!(matches!(
            matrix.load_row_major(&ragged),
            Err(StoreError::RaggedMatrix { row: 1, .. })
        ));
        assert!(matches!(
            matrix.load_column_major(&ragged),
            Err(StoreError::RaggedMatrix { row: 1, .. })
        ));
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_load_replaces_wholesale() {
        let matrix = SharedMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let old_row = matrix.get(0).unwrap();

        matrix.load_row_major(&[vec![9.0, 9.0], vec![8.0, 8.0]]).unwrap();

        // The old handle still sees the sequence it was cloned from.
        assert_eq!(old_row.get(0).unwrap(), 1.0);
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.get(0).unwrap().get(0).unwrap(), 9.0);
    }

    #[test]
    fn test_read_after_per_row_transpose() {
        let matrix = SharedMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        for i in 0..matrix.len() {
            matrix.get(i).unwrap().transpose();
        }
        assert_eq!(matrix.orientation().unwrap(), Orientation::Column);
        assert_eq!(
            matrix.read_row_major(),
            vec![vec![1.0, 3.0], vec![2.0, 4.0]]
        );
    }

    #[test]
    fn test_read_after_transpose_of_wide_matrix() {
        let matrix = SharedMatrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        matrix.get(0).unwrap().transpose();
        assert_eq!(
            matrix.read_row_major(),
            vec![vec![1.0], vec![2.0], vec![3.0]]
        );
    }

    #[test]
    fn test_read_sees_whole_rows_under_mutation() {
        let matrix = Arc::new(SharedMatrix::from_rows(&[vec![1.0, 1.0], vec![2.0, 2.0]]).unwrap());

        let writer_matrix = Arc::clone(&matrix);
        let writer = thread::spawn(move || {
            let row = writer_matrix.get(0).unwrap();
            for _ in 0..1000 {
                row.negate();
            }
        });

        for _ in 0..200 {
            let rows = matrix.read_row_major();
            // Each row lock is held for the whole copy, so a row is never
            // observed half-negated.
            for row in &rows {
                assert_eq!(row[0], row[1]);
            }
        }
        writer.join().unwrap();
    }
}
