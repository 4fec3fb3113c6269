//! Index-based forest layout used for serving.
//!
//! Every tree is laid out in depth-first preorder (root at position 0 of its
//! tree) in a set of parallel arrays. Child slots hold positions relative to
//! the tree's first node, or [`FLAT_LEAF`] for leaves. Leaf class counts are
//! stored contiguously, `nlevels` values per leaf.

use crate::core::constants::FLAT_LEAF;
use crate::core::error::{BitForestError, Result};
use crate::core::types::NodeIndex;
use crate::dataset::BinarizedMatrix;
use crate::tree::Tree;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Flattened forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatForest {
    nlevels: usize,
    /// First node of each tree, plus one past the last node
    tree_offsets: Vec<usize>,
    /// First leaf of each tree, plus one past the last leaf
    leaf_offsets: Vec<usize>,
    split_var: Vec<u32>,
    split_bcol: Vec<u32>,
    split_feature: Vec<u32>,
    left: Vec<u32>,
    right: Vec<u32>,
    /// Leaf number within the tree, `FLAT_LEAF` for internal nodes
    leaf_slot: Vec<u32>,
    counts: Vec<u64>,
}

/// One tree's records before concatenation.
struct FlatTree {
    split_var: Vec<u32>,
    split_bcol: Vec<u32>,
    split_feature: Vec<u32>,
    left: Vec<u32>,
    right: Vec<u32>,
    leaf_slot: Vec<u32>,
    counts: Vec<u64>,
    num_leaves: usize,
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|&v| v != FLAT_LEAF)
        .ok_or_else(|| {
            BitForestError::tree_construction(format!("{} {} does not fit a flat record", what, value))
        })
}

fn flatten_tree(tree: &Tree, nlevels: usize) -> Result<FlatTree> {
    // Preorder: position -> arena index, then the inverse map.
    let mut order: Vec<NodeIndex> = Vec::with_capacity(tree.num_nodes());
    let mut stack = vec![0];
    while let Some(index) = stack.pop() {
        order.push(index);
        let node = tree
            .node(index)
            .ok_or_else(|| BitForestError::internal("child index outside the node arena"))?;
        if let (Some(left), Some(right)) = (node.left_child(), node.right_child()) {
            stack.push(right);
            stack.push(left);
        }
    }
    let mut position = vec![FLAT_LEAF; tree.num_nodes()];
    for (pos, &index) in order.iter().enumerate() {
        position[index] = to_u32(pos, "node position")?;
    }

    let mut flat = FlatTree {
        split_var: Vec::with_capacity(order.len()),
        split_bcol: Vec::with_capacity(order.len()),
        split_feature: Vec::with_capacity(order.len()),
        left: Vec::with_capacity(order.len()),
        right: Vec::with_capacity(order.len()),
        leaf_slot: Vec::with_capacity(order.len()),
        counts: Vec::new(),
        num_leaves: 0,
    };

    for &index in &order {
        let node = &tree.nodes()[index];
        match (node.split(), node.left_child(), node.right_child()) {
            (Some(rule), Some(left), Some(right)) => {
                flat.split_var.push(to_u32(rule.var, "variable")?);
                flat.split_bcol.push(to_u32(rule.bcol, "feature column")?);
                flat.split_feature.push(to_u32(rule.feature, "feature")?);
                flat.left.push(position[left]);
                flat.right.push(position[right]);
                flat.leaf_slot.push(FLAT_LEAF);
            }
            _ => {
                if node.count().len() != nlevels {
                    return Err(BitForestError::dimension_mismatch(
                        format!("{} classes per leaf", nlevels),
                        format!("{} classes", node.count().len()),
                    ));
                }
                flat.split_var.push(FLAT_LEAF);
                flat.split_bcol.push(FLAT_LEAF);
                flat.split_feature.push(FLAT_LEAF);
                flat.left.push(FLAT_LEAF);
                flat.right.push(FLAT_LEAF);
                flat.leaf_slot.push(to_u32(flat.num_leaves, "leaf")?);
                flat.counts.extend_from_slice(node.count().as_slice());
                flat.num_leaves += 1;
            }
        }
    }
    Ok(flat)
}

impl FlatForest {
    /// Flatten `trees`, each of whose leaves carries `nlevels` class counts.
    pub fn flatten(trees: &[Tree], nlevels: usize) -> Result<Self> {
        let flats = trees
            .par_iter()
            .map(|tree| flatten_tree(tree, nlevels))
            .collect::<Result<Vec<FlatTree>>>()?;

        let total_nodes: usize = flats.iter().map(|f| f.left.len()).sum();
        let mut forest = FlatForest {
            nlevels,
            tree_offsets: Vec::with_capacity(flats.len() + 1),
            leaf_offsets: Vec::with_capacity(flats.len() + 1),
            split_var: Vec::with_capacity(total_nodes),
            split_bcol: Vec::with_capacity(total_nodes),
            split_feature: Vec::with_capacity(total_nodes),
            left: Vec::with_capacity(total_nodes),
            right: Vec::with_capacity(total_nodes),
            leaf_slot: Vec::with_capacity(total_nodes),
            counts: Vec::new(),
        };
        let total_leaves: usize = flats.iter().map(|f| f.num_leaves).sum();
        forest
            .counts
            .try_reserve_exact(total_leaves * nlevels)
            .map_err(|e| {
                BitForestError::memory(format!("leaf table for {} leaves: {}", total_leaves, e))
            })?;
        forest.tree_offsets.push(0);
        forest.leaf_offsets.push(0);
        for flat in flats {
            forest.split_var.extend(flat.split_var);
            forest.split_bcol.extend(flat.split_bcol);
            forest.split_feature.extend(flat.split_feature);
            forest.left.extend(flat.left);
            forest.right.extend(flat.right);
            forest.leaf_slot.extend(flat.leaf_slot);
            forest.counts.extend(flat.counts);
            forest.tree_offsets.push(forest.left.len());
            let last = forest.leaf_offsets.last().copied().unwrap_or(0);
            forest.leaf_offsets.push(last + flat.num_leaves);
        }

        log::debug!(
            "Flattened {} trees into {} node records and {} leaves",
            forest.num_trees(),
            forest.num_nodes(),
            forest.num_leaves()
        );
        Ok(forest)
    }

    /// Number of trees.
    pub fn num_trees(&self) -> usize {
        self.tree_offsets.len().saturating_sub(1)
    }

    /// Node records over all trees.
    pub fn num_nodes(&self) -> usize {
        self.left.len()
    }

    /// Leaves over all trees.
    pub fn num_leaves(&self) -> usize {
        self.leaf_offsets.last().copied().unwrap_or(0)
    }

    /// Classes per leaf.
    pub fn nlevels(&self) -> usize {
        self.nlevels
    }

    /// Node records of tree `tree`.
    pub fn tree_nodes(&self, tree: usize) -> usize {
        self.tree_offsets[tree + 1] - self.tree_offsets[tree]
    }

    /// Forest-wide leaf number reached by `row` of `matrix` in tree `tree`.
    pub fn find_leaf(&self, tree: usize, matrix: &BinarizedMatrix, row: usize) -> usize {
        let base = self.tree_offsets[tree];
        let mut pos = base;
        while self.left[pos] != FLAT_LEAF {
            let feature = self.split_feature[pos] as usize;
            let next = if matrix.feature(feature).get(row) {
                self.left[pos]
            } else {
                self.right[pos]
            };
            pos = base + next as usize;
        }
        self.leaf_offsets[tree] + self.leaf_slot[pos] as usize
    }

    /// Class counts of forest-wide leaf `leaf`.
    pub fn leaf(&self, leaf: usize) -> &[u64] {
        &self.counts[leaf * self.nlevels..(leaf + 1) * self.nlevels]
    }

    /// Class counts reached by `row` in tree `tree`.
    pub fn leaf_counts(&self, tree: usize, matrix: &BinarizedMatrix, row: usize) -> &[u64] {
        self.leaf(self.find_leaf(tree, matrix, row))
    }

    /// Number of splits on each of `num_vars` predictors over the forest.
    pub fn split_counts(&self, num_vars: usize) -> Vec<usize> {
        let mut counts = vec![0; num_vars];
        for &var in self.split_var.iter().filter(|&&v| v != FLAT_LEAF) {
            if let Some(c) = counts.get_mut(var as usize) {
                *c += 1;
            }
        }
        counts
    }

    /// `(variable, feature column)` of each internal node of tree `tree`, in preorder.
    pub fn split_sequence(&self, tree: usize) -> Vec<(usize, usize)> {
        (self.tree_offsets[tree]..self.tree_offsets[tree + 1])
            .filter(|&pos| self.left[pos] != FLAT_LEAF)
            .map(|pos| (self.split_var[pos] as usize, self.split_bcol[pos] as usize))
            .collect()
    }

    /// Check the layout before serving: offsets are monotone and cover the
    /// arrays, every record refers to one of `num_features` features, children
    /// sit after their parent inside the same tree, and leaf slots stay inside
    /// their tree's leaves.
    pub fn validate(&self, num_features: usize) -> Result<()> {
        let arrays = [
            self.split_var.len(),
            self.split_bcol.len(),
            self.split_feature.len(),
            self.right.len(),
            self.leaf_slot.len(),
        ];
        if arrays.iter().any(|&len| len != self.left.len()) {
            return Err(BitForestError::serialization("flat forest arrays differ in length"));
        }
        if self.tree_offsets.len() != self.leaf_offsets.len()
            || self.tree_offsets.first() != Some(&0)
            || self.leaf_offsets.first() != Some(&0)
        {
            return Err(BitForestError::serialization("flat forest offsets are malformed"));
        }
        // Every tree holds at least its root.
        if self.tree_offsets.windows(2).any(|w| w[0] >= w[1])
            || self.leaf_offsets.windows(2).any(|w| w[0] > w[1])
            || self.tree_offsets.last() != Some(&self.left.len())
            || self.counts.len() != self.num_leaves() * self.nlevels
        {
            return Err(BitForestError::serialization(
                "flat forest offsets do not cover the node and leaf arrays",
            ));
        }

        for tree in 0..self.num_trees() {
            let base = self.tree_offsets[tree];
            let size = self.tree_nodes(tree);
            let leaves = self.leaf_offsets[tree + 1] - self.leaf_offsets[tree];
            for pos in base..self.tree_offsets[tree + 1] {
                let rel = pos - base;
                let valid = if self.left[pos] == FLAT_LEAF {
                    (self.leaf_slot[pos] as usize) < leaves
                } else {
                    let (left, right) = (self.left[pos] as usize, self.right[pos] as usize);
                    rel < left
                        && left < size
                        && rel < right
                        && right < size
                        && (self.split_feature[pos] as usize) < num_features
                };
                if !valid {
                    return Err(BitForestError::serialization(format!(
                        "tree {} has an invalid record at position {}",
                        tree, rel
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bitrows::BitRows;
    use crate::tree::node::SplitRule;
    use crate::tree::ClassCounts;

    fn matrix() -> BinarizedMatrix {
        // One variable with two features over four rows.
        let f0 = BitRows::from_bools([true, true, false, false]);
        let f1 = BitRows::from_bools([true, false, true, false]);
        BinarizedMatrix::from_groups(vec![vec![f0, f1]], 4).unwrap()
    }

    fn two_level_tree() -> Tree {
        let mut tree = Tree::new(ClassCounts::from_vec(vec![2, 2]));
        let rule = SplitRule { var: 0, bcol: 0, feature: 0, gain: 0.5 };
        let (_, r) = tree
            .split_node(0, rule, ClassCounts::from_vec(vec![2, 0]), ClassCounts::from_vec(vec![0, 2]))
            .unwrap();
        let rule = SplitRule { var: 0, bcol: 1, feature: 1, gain: 0.1 };
        tree.split_node(r, rule, ClassCounts::from_vec(vec![0, 1]), ClassCounts::from_vec(vec![0, 1]))
            .unwrap();
        tree.finish();
        tree
    }

    #[test]
    fn test_flat_walk_matches_tree() {
        let matrix = matrix();
        let trees = vec![Tree::new(ClassCounts::from_vec(vec![3, 1])), two_level_tree()];
        let flat = FlatForest::flatten(&trees, 2).unwrap();

        assert_eq!(flat.num_trees(), 2);
        assert_eq!(flat.num_nodes(), 6);
        assert_eq!(flat.num_leaves(), 4);
        assert!(flat.validate(matrix.num_features()).is_ok());

        for (t, tree) in trees.iter().enumerate() {
            for row in 0..matrix.num_rows() {
                assert_eq!(
                    flat.leaf_counts(t, &matrix, row),
                    tree.leaf_counts(&matrix, row).as_slice()
                );
            }
            assert_eq!(flat.split_sequence(t), tree.split_sequence());
        }
        assert_eq!(flat.split_counts(1), vec![2]);
    }

    #[test]
    fn test_leaf_width_checked() {
        let trees = vec![Tree::new(ClassCounts::from_vec(vec![3, 1, 0]))];
        assert!(FlatForest::flatten(&trees, 2).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_features() {
        let flat = FlatForest::flatten(&[two_level_tree()], 2).unwrap();
        assert!(flat.validate(1).is_err());
    }

    #[test]
    fn test_validate_rejects_cycles() {
        let mut flat = FlatForest::flatten(&[two_level_tree()], 2).unwrap();
        flat.left[0] = 0;
        assert!(flat.validate(2).is_err());

        let mut flat = FlatForest::flatten(&[two_level_tree()], 2).unwrap();
        let inner = flat.left.iter().rposition(|&l| l != FLAT_LEAF).unwrap();
        flat.right[inner] = inner as u32 - 1;
        assert!(flat.validate(2).is_err());
    }

    #[test]
    fn test_validate_rejects_leaf_slots_outside_tree() {
        let trees = vec![Tree::new(ClassCounts::from_vec(vec![3, 1])), two_level_tree()];
        let mut flat = FlatForest::flatten(&trees, 2).unwrap();
        // The single-leaf tree only owns leaf 0.
        flat.leaf_slot[0] = 1;
        assert!(flat.validate(2).is_err());

        let mut flat = FlatForest::flatten(&trees, 2).unwrap();
        flat.leaf_slot[1 + 1] = 999;
        assert!(flat.validate(2).is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_offsets() {
        let trees = vec![Tree::new(ClassCounts::from_vec(vec![3, 1])), two_level_tree()];
        let flat = FlatForest::flatten(&trees, 2).unwrap();
        assert_eq!(flat.tree_offsets, vec![0, 1, 6]);
        assert_eq!(flat.leaf_offsets, vec![0, 1, 4]);

        let mut broken = flat.clone();
        broken.tree_offsets = vec![0, 6, 1];
        assert!(broken.validate(2).is_err());

        let mut broken = flat.clone();
        broken.tree_offsets = vec![0, 1, 5];
        assert!(broken.validate(2).is_err());

        let mut broken = flat.clone();
        broken.leaf_offsets = vec![0, 3, 1];
        assert!(broken.validate(2).is_err());

        let mut broken = flat;
        broken.tree_offsets = vec![0, 0, 6];
        assert!(broken.validate(2).is_err());
    }
}
