//! Decision tree stored as a node arena.
//!
//! Nodes live in one contiguous vector (index 0 is the root) and refer to
//! each other by index. The leaf list is rebuilt in depth-first order once
//! growth finishes.

use crate::core::constants::MAX_NODES;
use crate::core::error::{BitForestError, Result};
use crate::core::types::{NodeIndex, VarIndex};
use crate::dataset::BinarizedMatrix;
use crate::tree::counts::ClassCounts;
use crate::tree::node::{Node, SplitRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One tree of the forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
    leaves: Vec<NodeIndex>,
}

impl Tree {
    /// Creates a single-leaf tree holding `root_count`.
    pub fn new(root_count: ClassCounts) -> Self {
        Tree {
            nodes: vec![Node::new_leaf(root_count, 0, None, Vec::new())],
            leaves: vec![0],
        }
    }

    /// Returns the number of nodes in the tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of leaf nodes in the tree.
    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Returns the maximum depth over all nodes.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Returns a node by index.
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// All nodes, root first.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Leaf indices in depth-first order.
    pub fn leaves(&self) -> &[NodeIndex] {
        &self.leaves
    }

    /// Returns the root node.
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Splits leaf `index` into two children with the given counts.
    ///
    /// Fails without modifying the tree if `index` is not a leaf or the node
    /// limit would be exceeded.
    pub fn split_node(
        &mut self,
        index: NodeIndex,
        rule: SplitRule,
        left_count: ClassCounts,
        right_count: ClassCounts,
    ) -> Result<(NodeIndex, NodeIndex)> {
        let parent = self.nodes.get(index).ok_or_else(|| {
            BitForestError::tree_construction(format!("node {} out of bounds", index))
        })?;
        if !parent.is_leaf() {
            return Err(BitForestError::tree_construction(format!(
                "node {} is already split",
                index
            )));
        }
        if self.nodes.len() + 2 > MAX_NODES {
            return Err(BitForestError::tree_construction(format!(
                "node limit of {} reached",
                MAX_NODES
            )));
        }

        let depth = parent.depth() + 1;
        let left = Node::new_leaf(
            left_count,
            depth,
            Some(index),
            parent.child_rulepath(&rule, true),
        );
        let right = Node::new_leaf(
            right_count,
            depth,
            Some(index),
            parent.child_rulepath(&rule, false),
        );

        self.nodes.try_reserve(2)?;
        let left_index = self.nodes.len();
        let right_index = left_index + 1;
        self.nodes.push(left);
        self.nodes.push(right);
        self.nodes[index].set_split(rule, left_index, right_index);
        Ok((left_index, right_index))
    }

    /// Rebuilds the leaf list in depth-first (left before right) order.
    pub fn finish(&mut self) {
        let mut leaves = Vec::new();
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            match (node.left_child(), node.right_child()) {
                (Some(left), Some(right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                _ => leaves.push(index),
            }
        }
        self.leaves = leaves;
    }

    /// Leaf reached by row `row` of `matrix`.
    pub fn find_leaf(&self, matrix: &BinarizedMatrix, row: usize) -> NodeIndex {
        let mut index = 0;
        loop {
            let node = &self.nodes[index];
            match (node.split(), node.left_child(), node.right_child()) {
                (Some(rule), Some(left), Some(right)) => {
                    index = if matrix.feature(rule.feature).get(row) {
                        left
                    } else {
                        right
                    };
                }
                _ => return index,
            }
        }
    }

    /// Class counts of the leaf reached by row `row`.
    pub fn leaf_counts(&self, matrix: &BinarizedMatrix, row: usize) -> &ClassCounts {
        self.nodes[self.find_leaf(matrix, row)].count()
    }

    /// Number of splits on each of `num_vars` predictors.
    pub fn split_counts(&self, num_vars: usize) -> Vec<usize> {
        let mut counts = vec![0; num_vars];
        for rule in self.nodes.iter().filter_map(Node::split) {
            if rule.var < num_vars {
                counts[rule.var] += 1;
            }
        }
        counts
    }

    /// Validates structure, count conservation and the depth bound.
    pub fn validate(&self, max_depth: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(BitForestError::tree_construction("tree has no nodes"));
        }
        if self.nodes.len() > MAX_NODES {
            return Err(BitForestError::tree_construction(format!(
                "{} nodes exceed the limit of {}",
                self.nodes.len(),
                MAX_NODES
            )));
        }
        if self.root().parent().is_some() {
            return Err(BitForestError::tree_construction("root node has a parent"));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.depth() > max_depth {
                return Err(BitForestError::tree_construction(format!(
                    "node {} at depth {} exceeds max depth {}",
                    i,
                    node.depth(),
                    max_depth
                )));
            }
            if node.is_leaf() {
                continue;
            }
            let (left, right) = match (node.left_child(), node.right_child()) {
                (Some(l), Some(r)) if l < self.nodes.len() && r < self.nodes.len() => (l, r),
                _ => {
                    return Err(BitForestError::tree_construction(format!(
                        "internal node {} has invalid children",
                        i
                    )))
                }
            };
            if self.nodes[left].parent() != Some(i) || self.nodes[right].parent() != Some(i) {
                return Err(BitForestError::tree_construction(format!(
                    "children of node {} do not point back to it",
                    i
                )));
            }
            let sum = self.nodes[left].count().add(self.nodes[right].count());
            if &sum != node.count() {
                return Err(BitForestError::tree_construction(format!(
                    "node {} count {} differs from children sum {}",
                    i,
                    node.count(),
                    sum
                )));
            }
        }

        let num_leaves = self.nodes.iter().filter(|n| n.is_leaf()).count();
        if num_leaves != self.leaves.len() {
            return Err(BitForestError::tree_construction(format!(
                "leaf list holds {} entries, tree has {} leaves",
                self.leaves.len(),
                num_leaves
            )));
        }
        Ok(())
    }

    /// Variable used by each internal node in depth-first order.
    pub fn split_sequence(&self) -> Vec<(VarIndex, usize)> {
        let mut out = Vec::new();
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if let (Some(rule), Some(left), Some(right)) =
                (node.split(), node.left_child(), node.right_child())
            {
                out.push((rule.var, rule.bcol));
                stack.push(right);
                stack.push(left);
            }
        }
        out
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tree(nodes={}, leaves={}, depth={})",
            self.num_nodes(),
            self.num_leaves(),
            self.depth()
        )
    }
}
