// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tree nodes and the rewrites the engine relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

/// Operator tag of a non-leaf node.
///
/// The canonical wire tokens are the symbols; word aliases are accepted on
/// input for readability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+", alias = "add", alias = "ADD")]
    Add,
    #[serde(rename = "*", alias = "multiply", alias = "MULTIPLY")]
    Multiply,
    #[serde(rename = "-", alias = "negate", alias = "NEGATE")]
    Negate,
    #[serde(rename = "T", alias = "transpose", alias = "TRANSPOSE")]
    Transpose,
}

impl Operator {
    /// Number of operands the engine accepts for this operator.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Add | Self::Multiply => 2,
            Self::Negate | Self::Transpose => 1,
        }
    }

    /// Whether n-ary chains of this operator may be rebuilt as binary trees.
    #[must_use]
    pub fn is_associative(&self) -> bool {
        matches!(self, Self::Add | Self::Multiply)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Multiply => write!(f, "multiply"),
            Self::Negate => write!(f, "negate"),
            Self::Transpose => write!(f, "transpose"),
        }
    }
}

/// One node of a computation tree: a resolved row-major matrix, or an
/// operation over ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComputationNode {
    Leaf {
        matrix: Vec<Vec<f64>>,
    },
    Operation {
        op: Operator,
        children: Vec<ComputationNode>,
    },
}

impl ComputationNode {
    #[must_use]
    pub fn leaf(matrix: Vec<Vec<f64>>) -> Self {
        Self::Leaf { matrix }
    }

    #[must_use]
    pub fn operation(op: Operator, children: Vec<ComputationNode>) -> Self {
        Self::Operation { op, children }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Ordered children; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[ComputationNode] {
        match self {
            Self::Leaf { .. } => &[],
            Self::Operation { children, .. } => children,
        }
    }

    /// The resolved matrix. Fails on operation nodes.
    pub fn matrix(&self) -> Result<&[Vec<f64>]> {
        match self {
            Self::Leaf { matrix } => Ok(matrix),
            Self::Operation { .. } => Err(TreeError::Unresolved),
        }
    }

    /// Depth-first search for the first operation node whose children are all
    /// resolved. Returns `None` once the whole tree is a leaf.
    pub fn find_next_resolvable(&mut self) -> Option<&mut ComputationNode> {
        if self.is_leaf() {
            return None;
        }
        if self.children().iter().all(ComputationNode::is_leaf) {
            return Some(self);
        }
        if let Self::Operation { children, .. } = self {
            for child in children {
                if let Some(found) = child.find_next_resolvable() {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Replaces this node with a resolved leaf holding `matrix`.
    pub fn resolve(&mut self, matrix: Vec<Vec<f64>>) {
        *self = Self::Leaf { matrix };
    }

    /// Rewrites n-ary associative nodes into balanced binary trees.
    ///
    /// Child order is preserved (multiplication is associative, not
    /// commutative); unary and already-binary nodes only recurse. Idempotent.
    pub fn associative_flatten(&mut self) {
        let Self::Operation { op, children } = self else {
            return;
        };
        for child in children.iter_mut() {
            child.associative_flatten();
        }
        if !(op.is_associative() && children.len() > 2) {
            return;
        }
        let op = *op;
        let nodes = std::mem::take(children);
        *self = binarize(op, nodes);
    }

    /// Checks every leaf matrix for rectangularity.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Leaf { matrix } => {
                let Some(first) = matrix.first() else {
                    return Ok(());
                };
                let expected = first.len();
                for (row, values) in matrix.iter().enumerate().skip(1) {
                    if values.len() != expected {
                        return Err(TreeError::RaggedMatrix {
                            row,
                            expected,
                            actual: values.len(),
                        });
                    }
                }
                Ok(())
            },
            Self::Operation { children, .. } => {
                for child in children {
                    child.validate()?;
                }
                Ok(())
            },
        }
    }
}

fn binarize(op: Operator, mut nodes: Vec<ComputationNode>) -> ComputationNode {
    if nodes.len() <= 1 {
        return match nodes.pop() {
            Some(node) => node,
            None => ComputationNode::Operation {
                op,
                children: Vec::new(),
            },
        };
    }
    let tail = nodes.split_off(nodes.len().div_ceil(2));
    ComputationNode::Operation {
        op,
        children: vec![binarize(op, nodes), binarize(op, tail)],
    }
}
