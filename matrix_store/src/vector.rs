// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared, lock-guarded vectors.
//!
//! [`SharedVector`] is the unit of concurrent mutation in the store: a 1-D
//! `f64` buffer tagged with an [`Orientation`], both behind one
//! `parking_lot::RwLock` so the pair is always observed together.
//!
//! # Locking discipline
//!
//! - Snapshot accessors ([`get`](SharedVector::get), [`len`](SharedVector::len),
//!   [`orientation`](SharedVector::orientation)) hold the shared lock for the
//!   duration of the call.
//! - In-place operations ([`negate`](SharedVector::negate),
//!   [`transpose`](SharedVector::transpose)) hold the exclusive lock for the
//!   whole call.
//! - Two-vector operations ([`add`](SharedVector::add),
//!   [`dot`](SharedVector::dot)) acquire both locks in ascending
//!   creation-sequence order regardless of which operand is the receiver.
//! - [`mul_matrix`](SharedVector::mul_matrix) holds `self` exclusively for the
//!   whole call and takes each column's shared lock transiently; it never
//!   re-acquires `self`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, StoreError};
use crate::matrix::SharedMatrix;

/// Vector creation counter; the source of the lock-ordering identity.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Whether a vector stands for a matrix row or a matrix column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Row,
    Column,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => write!(f, "row"),
            Self::Column => write!(f, "column"),
        }
    }
}

/// The lock-guarded payload of a [`SharedVector`].
#[derive(Debug, Clone, PartialEq)]
pub struct VectorData {
    pub values: Vec<f64>,
    pub orientation: Orientation,
}

/// A mutable 1-D buffer shared between worker threads.
#[derive(Debug)]
pub struct SharedVector {
    /// Creation-sequence id; the stable total order for dual-lock acquisition.
    seq: u64,
    inner: RwLock<VectorData>,
}

impl SharedVector {
    #[must_use]
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            inner: RwLock::new(VectorData { values, orientation }),
        }
    }

    /// Element at `index`, read under the shared lock.
    pub fn get(&self, index: usize) -> Result<f64> {
        let data = self.inner.read();
        data.values
            .get(index)
            .copied()
            .ok_or(StoreError::IndexOutOfBounds {
                index,
                len: data.values.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().values.is_empty()
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.inner.read().orientation
    }

    /// Shared access to the raw payload. The guard keeps values and
    /// orientation consistent until it is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, VectorData> {
        self.inner.read()
    }

    /// Exclusive access to the raw payload.
    pub fn write(&self) -> RwLockWriteGuard<'_, VectorData> {
        self.inner.write()
    }

    /// Flips the orientation tag in place.
    ///
    /// Data is not reshaped. A matrix-wide transpose emerges only when a
    /// row-major read later reinterprets the flipped tags.
    pub fn transpose(&self) {
        let mut data = self.inner.write();
        data.orientation = match data.orientation {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        };
    }

    /// Negates every element in place.
    pub fn negate(&self) {
        let mut data = self.inner.write();
        for value in &mut data.values {
            *value = -*value;
        }
    }

    /// In-place elementwise `self += other`.
    ///
    /// Requires equal lengths and equal orientations. `self` is locked
    /// exclusively and `other` shared, in ascending creation-sequence order,
    /// so `a.add(&b)` racing `b.add(&a)` cannot deadlock. Adding a vector to
    /// itself doubles it under a single exclusive lock.
    pub fn add(&self, other: &SharedVector) -> Result<()> {
        if self.seq == other.seq {
            let mut data = self.inner.write();
            for value in &mut data.values {
                *value += *value;
            }
            return Ok(());
        }

        let mut self_data;
        let other_data;
        if self.seq < other.seq {
            self_data = self.inner.write();
            other_data = other.inner.read();
        } else {
            other_data = other.inner.read();
            self_data = self.inner.write();
        }

        if self_data.values.len() != other_data.values.len() {
            return Err(StoreError::LengthMismatch {
                left: self_data.values.len(),
                right: other_data.values.len(),
            });
        }
        if self_data.orientation != other_data.orientation {
            return Err(StoreError::OrientationMismatch {
                expected: self_data.orientation,
                actual: other_data.orientation,
            });
        }

        for (value, rhs) in self_data.values.iter_mut().zip(other_data.values.iter()) {
            *value += *rhs;
        }
        Ok(())
    }

    /// Dot product of a row vector with a column vector.
    ///
    /// Both locks are shared and taken in ascending creation-sequence order.
    pub fn dot(&self, other: &SharedVector) -> Result<f64> {
        if self.seq == other.seq {
            // One vector cannot be both operands; the orientation check below
            // fails under a single lock.
            let data = self.inner.read();
            return dot_checked(&data, &data);
        }

        let self_data;
        let other_data;
        if self.seq < other.seq {
            self_data = self.inner.read();
            other_data = other.inner.read();
        } else {
            other_data = other.inner.read();
            self_data = self.inner.read();
        }
        dot_checked(&self_data, &other_data)
    }

    /// In-place row × matrix product: `self` becomes `self × matrix`.
    ///
    /// Requires `self` row-oriented and `matrix` a non-empty column-major
    /// matrix whose column length equals `self.len()`. `self` stays
    /// exclusively locked for the whole call while each column is read
    /// transiently, so no concurrent reader can observe a half-updated row.
    pub fn mul_matrix(&self, matrix: &SharedMatrix) -> Result<()> {
        let columns = matrix.vectors();
        match columns.first() {
            None => return Err(StoreError::EmptyMatrix),
            Some(head) => {
                let head = head.read();
                if head.values.is_empty() {
                    return Err(StoreError::EmptyMatrix);
                }
                if head.orientation != Orientation::Column {
                    return Err(StoreError::OrientationMismatch {
                        expected: Orientation::Column,
                        actual: head.orientation,
                    });
                }
            },
        }

        let mut data = self.inner.write();
        if data.orientation != Orientation::Row {
            return Err(StoreError::OrientationMismatch {
                expected: Orientation::Row,
                actual: data.orientation,
            });
        }

        let mut result = Vec::with_capacity(columns.len());
        for column in &columns {
            // A column sharing our identity would already be exclusively
            // locked; it is also mis-tagged by definition, since we are Row.
            if column.seq == self.seq {
                return Err(StoreError::OrientationMismatch {
                    expected: Orientation::Column,
                    actual: data.orientation,
                });
            }
            let column = column.read();
            result.push(dot_checked(&data, &column)?);
        }

        data.values = result;
        Ok(())
    }
}

fn dot_checked(a: &VectorData, b: &VectorData) -> Result<f64> {
    if a.orientation != Orientation::Row {
        return Err(StoreError::OrientationMismatch {
            expected: Orientation::Row,
            actual: a.orientation,
        });
    }
    if b.orientation != Orientation::Column {
        return Err(StoreError::OrientationMismatch {
            expected: Orientation::Column,
            actual: b.orientation,
        });
    }
    if a.values.len() != b.values.len() {
        return Err(StoreError::LengthMismatch {
            left: a.values.len(),
            right: b.values.len(),
        });
    }
    Ok(a.values
        .iter()
        .zip(b.values.iter())
        .map(|(x, y)| x * y)
        .sum())
}
