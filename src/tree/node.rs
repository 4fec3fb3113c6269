//! Tree node implementation.
//!
//! A node is either internal (it carries a [`SplitRule`] and two child
//! indices) or a leaf. Both kinds keep the class counts of the bootstrap rows
//! that reached them and the rule path taken from the root.

use crate::core::types::{BinaryFeatureIndex, NodeIndex, VarIndex};
use crate::tree::counts::ClassCounts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Split decision of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRule {
    /// Predictor the split tests
    pub var: VarIndex,
    /// Binary feature within the predictor
    pub bcol: usize,
    /// Global binary feature index
    pub feature: BinaryFeatureIndex,
    /// Impurity reduction achieved
    pub gain: f64,
}

/// One decision on the way from the root to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleStep {
    /// Predictor tested
    pub var: VarIndex,
    /// Binary feature within the predictor
    pub bcol: usize,
    /// Whether the feature bit was set (left branch)
    pub is_left: bool,
}

/// Tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    split: Option<SplitRule>,
    left_child: Option<NodeIndex>,
    right_child: Option<NodeIndex>,
    parent: Option<NodeIndex>,
    rulepath: Vec<RuleStep>,
    depth: usize,
    count: ClassCounts,
}

impl Node {
    /// Creates a leaf.
    pub fn new_leaf(
        count: ClassCounts,
        depth: usize,
        parent: Option<NodeIndex>,
        rulepath: Vec<RuleStep>,
    ) -> Self {
        Node {
            split: None,
            left_child: None,
            right_child: None,
            parent,
            rulepath,
            depth,
            count,
        }
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }

    /// Split rule of an internal node.
    pub fn split(&self) -> Option<&SplitRule> {
        self.split.as_ref()
    }

    /// Left child (rows whose feature bit is set).
    pub fn left_child(&self) -> Option<NodeIndex> {
        self.left_child
    }

    /// Right child (rows whose feature bit is clear).
    pub fn right_child(&self) -> Option<NodeIndex> {
        self.right_child
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Decisions leading to this node.
    pub fn rulepath(&self) -> &[RuleStep] {
        &self.rulepath
    }

    /// Depth (root is 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Class counts of the rows reaching this node.
    pub fn count(&self) -> &ClassCounts {
        &self.count
    }

    /// Rule path of a child taking branch `is_left` of `rule`.
    pub fn child_rulepath(&self, rule: &SplitRule, is_left: bool) -> Vec<RuleStep> {
        let mut path = Vec::with_capacity(self.rulepath.len() + 1);
        path.extend_from_slice(&self.rulepath);
        path.push(RuleStep {
            var: rule.var,
            bcol: rule.bcol,
            is_left,
        });
        path
    }

    pub(crate) fn set_split(&mut self, rule: SplitRule, left: NodeIndex, right: NodeIndex) {
        self.split = Some(rule);
        self.left_child = Some(left);
        self.right_child = Some(right);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.split {
            Some(rule) => write!(
                f,
                "Split(var={}, bcol={}, gain={:.4}, count={})",
                rule.var, rule.bcol, rule.gain, self.count
            ),
            None => write!(f, "Leaf(depth={}, count={})", self.depth, self.count),
        }
    }
}
