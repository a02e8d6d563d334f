// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading computation trees and writing results.
//!
//! The output file always ends up meaningful: the resolved matrix on success,
//! an `{"error": ...}` payload when the computation failed.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::node::ComputationNode;

/// Reads and validates a computation tree from a JSON file.
pub fn read_tree(path: impl AsRef<Path>) -> Result<ComputationNode> {
    let text = fs::read_to_string(path)?;
    let node: ComputationNode = serde_json::from_str(&text)?;
    node.validate()?;
    Ok(node)
}

/// Writes a resolved matrix to `path` as a JSON 2-D array.
pub fn write_matrix(path: impl AsRef<Path>, matrix: &[Vec<f64>]) -> Result<()> {
    let text = serde_json::to_string_pretty(matrix)?;
    fs::write(path, text)?;
    Ok(())
}

/// Writes a failure payload to `path`.
pub fn write_error(path: impl AsRef<Path>, message: &str) -> Result<()> {
    let payload = serde_json::json!({ "error": message });
    let text = serde_json::to_string_pretty(&payload)?;
    fs::write(path, text)?;
    Ok(())
}
