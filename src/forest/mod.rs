//! Forest building.
//!
//! Trees are grown in parallel on a pool of `num_threads` workers. Each tree
//! is owned by the worker growing it and its random stream depends only on
//! the seed and the tree index, so the forest does not depend on how trees
//! are scheduled. The finished trees are appended to the caller's forest in
//! one step, and only if every tree succeeded.

use crate::config::Config;
use crate::core::error::{BitForestError, Result};
use crate::core::types::DeviceType;
use crate::dataset::{BinarizedMatrix, ResponseCode};
use crate::tree::learner::{SerialTreeLearner, SerialTreeLearnerConfig};
use crate::tree::split::{create_evaluator, EvaluatorStats, SplitEvaluator};
use crate::tree::Tree;
use rayon::prelude::*;
use std::fmt;
use std::time::{Duration, Instant};

/// Statistics of one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    /// Trees built
    pub num_trees: usize,
    /// Nodes over all trees
    pub total_nodes: usize,
    /// Leaves over all trees
    pub total_leaves: usize,
    /// Deepest tree
    pub max_depth: usize,
    /// Backend requested
    pub backend: DeviceType,
    /// Node evaluations per backend
    pub evaluations: EvaluatorStats,
    /// Wall-clock time
    pub elapsed: Duration,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} trees ({} nodes, {} leaves, max depth {}) on {} in {:.3}s [cpu nodes: {}, gpu nodes: {}]",
            self.num_trees,
            self.total_nodes,
            self.total_leaves,
            self.max_depth,
            self.backend,
            self.elapsed.as_secs_f64(),
            self.evaluations.cpu_nodes,
            self.evaluations.gpu_nodes
        )
    }
}

/// Grows the trees of a forest.
#[derive(Debug, Clone)]
pub struct ForestBuilder {
    config: Config,
}

impl ForestBuilder {
    /// Builder for `config`; the configuration is validated here.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(ForestBuilder {
            config: config.clone(),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build `num_trees` trees with the configured backend.
    pub fn build(
        &self,
        matrix: &BinarizedMatrix,
        response: &ResponseCode,
    ) -> Result<(Vec<Tree>, BuildSummary)> {
        let evaluator = create_evaluator(&self.config.device_config())?;
        self.build_with(matrix, response, evaluator.as_ref())
    }

    /// Build with an explicit evaluator.
    pub fn build_with(
        &self,
        matrix: &BinarizedMatrix,
        response: &ResponseCode,
        evaluator: &dyn SplitEvaluator,
    ) -> Result<(Vec<Tree>, BuildSummary)> {
        let start = Instant::now();
        let mut trees = Vec::new();
        self.append_trees(&mut trees, 0, matrix, response, evaluator)?;

        let summary = BuildSummary {
            num_trees: trees.len(),
            total_nodes: trees.iter().map(Tree::num_nodes).sum(),
            total_leaves: trees.iter().map(Tree::num_leaves).sum(),
            max_depth: trees.iter().map(Tree::depth).max().unwrap_or(0),
            backend: self.config.device_type,
            evaluations: evaluator.stats(),
            elapsed: start.elapsed(),
        };
        log::info!("Built forest: {}", summary);
        Ok((trees, summary))
    }

    /// Grow `num_trees` more trees, numbered from `first_index`, and append
    /// them to `forest`. On error `forest` is left untouched.
    pub fn append_trees(
        &self,
        forest: &mut Vec<Tree>,
        first_index: usize,
        matrix: &BinarizedMatrix,
        response: &ResponseCode,
        evaluator: &dyn SplitEvaluator,
    ) -> Result<()> {
        if matrix.num_rows() == 0 {
            return Err(BitForestError::training("cannot grow trees on zero rows"));
        }
        let learner = SerialTreeLearner::new(
            SerialTreeLearnerConfig::from_config(&self.config, matrix.num_vars()),
            matrix,
            response,
            evaluator,
        )?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .thread_name(|i| format!("bitforest-tree-{}", i))
            .build()
            .map_err(|e| BitForestError::training(format!("Failed to create thread pool: {}", e)))?;

        let max_depth = self.config.max_depth;
        let range = first_index..first_index + self.config.num_trees;
        log::debug!(
            "Growing trees {:?} on {} threads with the {} evaluator",
            range,
            self.config.num_threads,
            evaluator.name()
        );

        let grown = pool.install(|| {
            range
                .into_par_iter()
                .map(|t| {
                    let tree = learner.grow(t)?;
                    tree.validate(max_depth)?;
                    Ok(tree)
                })
                .collect::<Result<Vec<Tree>>>()
        })?;

        forest.extend(grown);
        Ok(())
    }
}
