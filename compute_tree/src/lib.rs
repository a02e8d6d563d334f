// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matrix computation trees.
//!
//! A tree is either a resolved leaf holding row-major 2-D data or an operator
//! over ordered children. The engine consumes trees through a narrow
//! contract: find the next node whose children are all resolved, compute it,
//! fold the result back in with [`ComputationNode::resolve`]. JSON is the
//! wire format on both ends (`{"matrix": [[...]]}` leaves,
//! `{"op": "+", "children": [...]}` operations).

pub mod error;
pub mod io;
pub mod node;

pub use error::{Result, TreeError};
pub use io::{read_tree, write_error, write_matrix};
pub use node::{ComputationNode, Operator};
