//! System constants and default configuration values for bitforest.

use crate::core::types::*;
use static_assertions::const_assert;

/// Number of rows packed into one [`BitBlock`].
pub const BITS_PER_BLOCK: usize = BitBlock::BITS as usize;

const_assert!(BITS_PER_BLOCK == 64);

/// Hard upper bound on tree depth.
pub const MAX_DEPTH: usize = 40;

/// Hard upper bound on the number of nodes in one tree.
pub const MAX_NODES: usize = 1 << 20;

/// Code returned for factor levels never seen while training.
pub const UNKNOWN_FACTOR_CODE: u32 = u32::MAX;

/// Marker stored in flattened child slots of leaf records.
pub const FLAT_LEAF: u32 = u32::MAX;

/// Default number of trees.
pub const DEFAULT_NUM_TREES: usize = 100;

/// Default maximum tree depth.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Default minimum number of (bootstrap) rows a node needs to be split.
pub const DEFAULT_MIN_NODE_SIZE: usize = 1;

/// Default number of cuts requested for numeric predictors.
pub const DEFAULT_NUMERIC_CUTS: usize = 32;

/// Default number of cuts requested for integer predictors.
pub const DEFAULT_INTEGER_CUTS: usize = 32;

/// Default maximum classes for an integer/numeric classification response.
pub const DEFAULT_MAX_INTEGER_CLASSES: usize = 20;

/// Default number of buckets used to code a regression response.
pub const DEFAULT_REGRESSION_BUCKETS: usize = 32;

/// Default accelerator block size in rows.
pub const DEFAULT_GPU_BLOCK_SIZE: usize = 1024;

/// Default hybrid routing threshold in rows.
pub const DEFAULT_HYBRID_THRESHOLD: usize = 50_000;

/// Number of accelerator devices exposed by the host device queue.
pub const NUM_ACCELERATOR_DEVICES: usize = 1;

/// Default random seed for reproducibility.
pub const DEFAULT_RANDOM_SEED: u64 = 0;

/// Multiplier deriving per-tree seeds from the global seed.
pub const TREE_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Minimum gain for a split to count as an impurity reduction.
pub const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Default verbosity level for logging.
pub const DEFAULT_VERBOSITY: VerbosityLevel = VerbosityLevel::Info;

/// Library version string.
pub const BITFOREST_VERSION: &str = env!("CARGO_PKG_VERSION");
