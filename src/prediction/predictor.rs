//! Forest prediction engine.
//!
//! Rows are scored independently, so the row range is split across a pool
//! of `num_threads` workers while the flattened forest is shared read-only.

use crate::core::error::{BitForestError, Result};
use crate::core::types::VoteMethod;
use crate::dataset::{BinarizedMatrix, ResponseCode};
use crate::model::FlatForest;
use crate::prediction::scores::ScoreMatrix;
use crate::tree::ClassCounts;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for prediction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Aggregation of leaf outputs
    pub vote_method: VoteMethod,
    /// Worker threads
    pub num_threads: usize,
    /// Use only the first `n` trees (None = all)
    pub num_trees: Option<usize>,
}

impl PredictionConfig {
    /// Create a new prediction configuration with defaults
    pub fn new() -> Self {
        PredictionConfig {
            vote_method: VoteMethod::default(),
            num_threads: num_cpus::get(),
            num_trees: None,
        }
    }

    /// Set the vote method
    pub fn with_vote_method(mut self, vote_method: VoteMethod) -> Self {
        self.vote_method = vote_method;
        self
    }

    /// Set the number of worker threads
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Limit prediction to the first `num_trees` trees
    pub fn with_num_trees(mut self, num_trees: Option<usize>) -> Self {
        self.num_trees = num_trees;
        self
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Scores binarized rows against a flattened forest.
#[derive(Debug)]
pub struct Predictor<'a> {
    config: PredictionConfig,
    forest: &'a FlatForest,
    response: &'a ResponseCode,
    num_trees: usize,
}

impl<'a> Predictor<'a> {
    /// Create a predictor over `forest`, whose classes are described by `response`.
    pub fn new(
        forest: &'a FlatForest,
        response: &'a ResponseCode,
        config: PredictionConfig,
    ) -> Result<Self> {
        if config.num_threads == 0 {
            return Err(BitForestError::invalid_parameter(
                "num_threads",
                "0",
                "must be at least 1",
            ));
        }
        if forest.nlevels() != response.nlevels() {
            return Err(BitForestError::dimension_mismatch(
                format!("{} classes", response.nlevels()),
                format!("{} classes in the forest", forest.nlevels()),
            ));
        }
        let num_trees = match config.num_trees {
            Some(n) => n.min(forest.num_trees()),
            None => forest.num_trees(),
        };
        if num_trees == 0 {
            return Err(BitForestError::prediction("forest has no trees to predict with"));
        }
        Ok(Predictor {
            config,
            forest,
            response,
            num_trees,
        })
    }

    /// Get prediction configuration
    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Trees used per row.
    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// Score every row of `matrix`: `[nlevels, num_rows]`, each column
    /// normalized by the number of trees.
    pub fn predict(&self, matrix: &BinarizedMatrix) -> Result<ScoreMatrix> {
        let nlevels = self.forest.nlevels();
        let n = matrix.num_rows();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| BitForestError::prediction(format!("Failed to create thread pool: {}", e)))?;

        let rows: Vec<Vec<f64>> =
            pool.install(|| (0..n).into_par_iter().map(|row| self.score_row(matrix, row)).collect());

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let scores = Array2::from_shape_vec((n, nlevels), flat)
            .map_err(|e| BitForestError::internal(format!("score shape: {}", e)))?
            .reversed_axes();
        log::debug!(
            "Scored {} rows with {} trees ({} vote)",
            n,
            self.num_trees,
            self.config.vote_method
        );

        Ok(ScoreMatrix::new(
            scores.as_standard_layout().into_owned(),
            self.response.level_names().to_vec(),
            self.response.yavg().to_vec(),
        ))
    }

    fn score_row(&self, matrix: &BinarizedMatrix, row: usize) -> Vec<f64> {
        let mut acc = vec![0.0; self.forest.nlevels()];
        for tree in 0..self.num_trees {
            let counts = self.forest.leaf_counts(tree, matrix, row);
            match self.config.vote_method {
                VoteMethod::Hard => {
                    if let Some(k) = ClassCounts::plurality_of(counts) {
                        acc[k] += 1.0;
                    }
                }
                VoteMethod::Soft => ClassCounts::add_frequencies(counts, &mut acc),
            }
        }
        let ntrees = self.num_trees as f64;
        acc.iter_mut().for_each(|a| *a /= ntrees);
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bitrows::BitRows;
    use crate::core::types::TaskType;
    use crate::dataset::{Column, ResponseEncoder};
    use crate::tree::node::SplitRule;
    use crate::tree::{ClassCounts, Tree};
    use approx::assert_relative_eq;

    fn setup() -> (FlatForest, ResponseCode, BinarizedMatrix) {
        let mut tree = Tree::new(ClassCounts::from_vec(vec![3, 3]));
        let rule = SplitRule { var: 0, bcol: 0, feature: 0, gain: 0.3 };
        tree.split_node(0, rule, ClassCounts::from_vec(vec![3, 1]), ClassCounts::from_vec(vec![0, 2]))
            .unwrap();
        tree.finish();
        let stump = Tree::new(ClassCounts::from_vec(vec![1, 1]));
        let forest = FlatForest::flatten(&[tree, stump], 2).unwrap();

        let response = ResponseEncoder::new(TaskType::Classification, 10, 10)
            .encode(&Column::factor(&["a", "b"]))
            .unwrap();
        let matrix = BinarizedMatrix::from_groups(
            vec![vec![BitRows::from_bools([true, false])]],
            2,
        )
        .unwrap();
        (forest, response, matrix)
    }

    #[test]
    fn test_soft_vote() {
        let (forest, response, matrix) = setup();
        let config = PredictionConfig::new().with_num_threads(2);
        let scores = Predictor::new(&forest, &response, config)
            .unwrap()
            .predict(&matrix)
            .unwrap();
        let s = scores.scores();
        assert_eq!(s.dim(), (2, 2));
        assert_relative_eq!(s[[0, 0]], (0.75 + 0.5) / 2.0);
        assert_relative_eq!(s[[1, 0]], (0.25 + 0.5) / 2.0);
        assert_relative_eq!(s[[0, 1]], 0.25);
        assert_relative_eq!(s[[1, 1]], 0.75);
    }

    #[test]
    fn test_hard_vote_ties_go_low() {
        let (forest, response, matrix) = setup();
        let config = PredictionConfig::new()
            .with_vote_method(VoteMethod::Hard)
            .with_num_threads(1);
        let scores = Predictor::new(&forest, &response, config)
            .unwrap()
            .predict(&matrix)
            .unwrap();
        let s = scores.scores();
        assert_relative_eq!(s[[0, 0]], 1.0);
        assert_relative_eq!(s[[0, 1]], 0.5);
        assert_relative_eq!(s[[1, 1]], 0.5);
    }

    #[test]
    fn test_tree_limit_and_errors() {
        let (forest, response, matrix) = setup();
        let config = PredictionConfig::new().with_num_trees(Some(1)).with_num_threads(1);
        let predictor = Predictor::new(&forest, &response, config).unwrap();
        assert_eq!(predictor.num_trees(), 1);
        let s = predictor.predict(&matrix).unwrap();
        assert_relative_eq!(s.scores()[[1, 1]], 1.0);

        assert!(Predictor::new(&forest, &response, PredictionConfig::new().with_num_threads(0)).is_err());
        assert!(Predictor::new(
            &forest,
            &response,
            PredictionConfig::new().with_num_trees(Some(0))
        )
        .is_err());
    }

    #[test]
    fn test_empty_leaves_cast_no_vote() {
        let (_, response, matrix) = setup();
        let mut tree = Tree::new(ClassCounts::from_vec(vec![3, 3]));
        let rule = SplitRule { var: 0, bcol: 0, feature: 0, gain: 0.3 };
        tree.split_node(0, rule, ClassCounts::from_vec(vec![3, 1]), ClassCounts::from_vec(vec![0, 2]))
            .unwrap();
        tree.finish();
        let empty = Tree::new(ClassCounts::zeros(2));
        let forest = FlatForest::flatten(&[tree, empty], 2).unwrap();

        for vote_method in [VoteMethod::Hard, VoteMethod::Soft] {
            let config = PredictionConfig::new()
                .with_vote_method(vote_method)
                .with_num_threads(1);
            let scores = Predictor::new(&forest, &response, config)
                .unwrap()
                .predict(&matrix)
                .unwrap();
            let s = scores.scores();
            assert_relative_eq!(s[[0, 0]] + s[[1, 0]], 0.5);
            assert_relative_eq!(s[[0, 1]] + s[[1, 1]], 0.5);
        }
    }
}
