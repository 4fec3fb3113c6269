//! Serial tree learner.
//!
//! Grows one tree depth-first on the calling thread. Candidate evaluation is
//! delegated to a [`SplitEvaluator`]; the choice of split is made here so it
//! is identical for every backend.

use crate::config::Config;
use crate::core::bitrows::BitRows;
use crate::core::constants::{MAX_NODES, MIN_SPLIT_GAIN};
use crate::core::error::{BitForestError, Result};
use crate::core::types::{NodeIndex, SplitCriterion};
use crate::dataset::{BinarizedMatrix, ResponseCode};
use crate::tree::counts::ClassCounts;
use crate::tree::node::SplitRule;
use crate::tree::sampling::{tree_rng, BootstrapSample, FeatureSampler};
use crate::tree::split::{split_gain, SampleMasks, SplitEvaluator};
use crate::tree::tree::Tree;

/// Configuration for the serial tree learner.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialTreeLearnerConfig {
    /// Maximum tree depth
    pub max_depth: usize,
    /// Nodes with fewer (weighted) rows are not split
    pub min_node_size: usize,
    /// Variables sampled per split
    pub features_per_split: usize,
    /// Impurity criterion
    pub criterion: SplitCriterion,
    /// Bootstrap with replacement
    pub replace: bool,
    /// Sample size as a fraction of the rows
    pub sample_fraction: f64,
    /// Global seed
    pub seed: u64,
}

impl SerialTreeLearnerConfig {
    /// Learner settings for `num_vars` predictors under `config`.
    pub fn from_config(config: &Config, num_vars: usize) -> Self {
        SerialTreeLearnerConfig {
            max_depth: config.max_depth,
            min_node_size: config.min_node_size,
            features_per_split: config.effective_features_per_split(num_vars),
            criterion: config.effective_criterion(),
            replace: config.replace,
            sample_fraction: config.sample_fraction,
            seed: config.random_seed,
        }
    }
}

/// Grows single trees over a shared binarized matrix.
pub struct SerialTreeLearner<'a> {
    config: SerialTreeLearnerConfig,
    matrix: &'a BinarizedMatrix,
    response: &'a ResponseCode,
    evaluator: &'a dyn SplitEvaluator,
}

impl std::fmt::Debug for SerialTreeLearner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTreeLearner")
            .field("config", &self.config)
            .field("num_rows", &self.matrix.num_rows())
            .field("nlevels", &self.response.nlevels())
            .field("evaluator", &self.evaluator.name())
            .finish()
    }
}

struct Candidate {
    rule: SplitRule,
    left: ClassCounts,
    right: ClassCounts,
}

impl<'a> SerialTreeLearner<'a> {
    /// Creates a learner. The response must carry the class of every matrix row.
    pub fn new(
        config: SerialTreeLearnerConfig,
        matrix: &'a BinarizedMatrix,
        response: &'a ResponseCode,
        evaluator: &'a dyn SplitEvaluator,
    ) -> Result<Self> {
        if response.classes().len() != matrix.num_rows() {
            return Err(BitForestError::dimension_mismatch(
                format!("{} response rows", matrix.num_rows()),
                format!("{} response rows", response.classes().len()),
            ));
        }
        Ok(SerialTreeLearner {
            config,
            matrix,
            response,
            evaluator,
        })
    }

    /// Grow tree number `tree_index` of the forest.
    pub fn grow(&self, tree_index: usize) -> Result<Tree> {
        let mut rng = tree_rng(self.config.seed, tree_index);
        let n = self.matrix.num_rows();
        let sample =
            BootstrapSample::draw(n, self.config.replace, self.config.sample_fraction, &mut rng);
        let masks = SampleMasks::new(self.response.classes(), self.response.nlevels(), &sample);
        let sampler = FeatureSampler::new(self.matrix.num_vars(), self.config.features_per_split);

        let root_rows = sample.in_bag().clone();
        let mut tree = Tree::new(masks.restrict(&root_rows).totals());
        let mut stack: Vec<(NodeIndex, BitRows)> = vec![(0, root_rows)];
        let mut node_limit_hit = false;

        while let Some((index, rows)) = stack.pop() {
            let (depth, count) = match tree.node(index) {
                Some(node) => (node.depth(), node.count().clone()),
                None => return Err(BitForestError::internal("open node missing from arena")),
            };
            if depth >= self.config.max_depth
                || (count.total() as usize) < self.config.min_node_size
                || count.is_pure()
            {
                continue;
            }
            if tree.num_nodes() + 2 > MAX_NODES {
                node_limit_hit = true;
                continue;
            }

            let vars = sampler.sample(&mut rng);
            let best = match self.best_split(&masks, &rows, &count, &vars)? {
                Some(best) => best,
                None => continue,
            };

            let feature = self.matrix.feature(best.rule.feature);
            let left_rows = rows.and(feature);
            let right_rows = rows.and_not(feature);
            let (left, right) = tree.split_node(index, best.rule, best.left, best.right)?;
            stack.push((right, right_rows));
            stack.push((left, left_rows));
        }

        if node_limit_hit {
            log::warn!(
                "Tree {} reached the node limit of {}; remaining nodes became leaves",
                tree_index,
                MAX_NODES
            );
        }
        tree.finish();
        log::trace!("Tree {} grown: {}", tree_index, tree);
        Ok(tree)
    }

    /// Highest-gain split among the binary features of `vars`. Ties keep the
    /// earliest candidate, i.e. the lowest variable and then feature index.
    fn best_split(
        &self,
        masks: &SampleMasks,
        rows: &BitRows,
        count: &ClassCounts,
        vars: &[usize],
    ) -> Result<Option<Candidate>> {
        let candidates: Vec<(usize, usize)> = vars
            .iter()
            .flat_map(|&var| (0..self.matrix.n_bcols(var)).map(move |k| (var, k)))
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let features: Vec<&BitRows> = candidates
            .iter()
            .map(|&(var, k)| self.matrix.feature(self.matrix.feature_index(var, k)))
            .collect();
        let node = masks.restrict(rows);
        let lefts = self.evaluator.left_counts(&node, &features)?;

        let mut best: Option<Candidate> = None;
        let mut best_gain = MIN_SPLIT_GAIN;
        for (&(var, k), left) in candidates.iter().zip(lefts) {
            let right = count.checked_sub(&left)?;
            if left.total() == 0 || right.total() == 0 {
                continue;
            }
            let gain = split_gain(
                self.config.criterion,
                count,
                &left,
                &right,
                self.response.yavg(),
            );
            if gain > best_gain {
                best_gain = gain;
                best = Some(Candidate {
                    rule: SplitRule {
                        var,
                        bcol: k,
                        feature: self.matrix.feature_index(var, k),
                        gain,
                    },
                    left,
                    right,
                });
            }
        }
        Ok(best)
    }
}
