//! Decision trees over binarized data.
//!
//! - [`tree`] / [`node`]: the node arena and its nodes
//! - [`counts`]: per-class count vectors carried by every node
//! - [`sampling`]: bootstrap bit planes and per-split variable sampling
//! - [`split`]: gain criteria and the CPU, accelerator and hybrid evaluators
//! - [`learner`]: growth of a single tree

pub mod counts;
pub mod learner;
pub mod node;
pub mod sampling;
pub mod split;
pub mod tree;

pub use counts::ClassCounts;
pub use learner::{SerialTreeLearner, SerialTreeLearnerConfig};
pub use node::{Node, RuleStep, SplitRule};
pub use sampling::{BootstrapSample, FeatureSampler};
pub use split::{
    create_evaluator, CpuSplitEvaluator, EvaluatorStats, GpuSplitEvaluator, HybridSplitEvaluator,
    SplitEvaluator,
};
pub use tree::Tree;
