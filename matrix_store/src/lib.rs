// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrency-safe shared vectors and matrices.
//!
//! `matrix_store` is the memory model under the Lockstep engine: matrices are
//! ordered collections of independently lockable vectors, so a batch of worker
//! threads can mutate distinct rows of one matrix in parallel while readers
//! still observe every row as a consistent unit.
//!
//! # Design Philosophy
//!
//! - **One lock per vector.** Each [`SharedVector`] guards its `(values,
//!   orientation)` pair with a single `parking_lot::RwLock`; the pair is never
//!   observable half-updated.
//! - **Ordered dual acquisition.** Two-vector operations take both locks in
//!   ascending creation-sequence order, never in call order, so crossed calls
//!   from different threads cannot deadlock.
//! - **Wholesale replacement.** A [`SharedMatrix`] swaps its backing sequence
//!   as a unit on load; handles cloned out earlier keep seeing the rows they
//!   were cloned from.
//!
//! # Thread Safety
//!
//! All types are `Send + Sync`. Mutating operations take `&self`; exclusion is
//! the lock's job, not the borrow checker's.

pub mod error;
pub mod matrix;
pub mod vector;

pub use error::{Result, StoreError};
pub use matrix::SharedMatrix;
pub use vector::{Orientation, SharedVector, VectorData};
