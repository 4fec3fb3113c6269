//! Core configuration structure and builder for bitforest.
//!
//! [`Config`] carries every option recognised by the forest engine: tree
//! count and shape limits, cut counts, response coding, sampling, and backend
//! selection. It is validated once, before any building work starts, so that
//! configuration problems surface as a single structured error.

use crate::config::device::DeviceConfig;
use crate::core::constants::*;
use crate::core::error::{BitForestError, Result};
use crate::core::types::*;
use crate::{config_error, ensure};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main configuration structure for forest training and prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Task
    /// Regression or classification
    pub task: TaskType,
    /// Split criterion (None = default for the task)
    pub criterion: Option<SplitCriterion>,
    /// Aggregation of per-tree leaf outputs
    pub vote_method: VoteMethod,

    // Forest shape
    /// Number of trees in the forest
    pub num_trees: usize,
    /// Maximum depth of any tree
    pub max_depth: usize,
    /// Nodes with fewer (bootstrap) rows than this become leaves
    pub min_node_size: usize,
    /// Variables sampled per split (0 = floor(sqrt(p)))
    pub features_per_split: usize,

    // Sampling
    /// Draw the per-tree sample with replacement
    pub replace: bool,
    /// Per-tree sample size as a fraction of the training rows
    pub sample_fraction: f64,
    /// Random seed for reproducible results
    pub random_seed: u64,

    // Binarization
    /// Requested cuts for numeric predictors
    pub n_numeric_cuts: usize,
    /// Requested cuts for integer predictors
    pub n_integer_cuts: usize,
    /// First code assigned to factor levels (0 or 1)
    pub factor_start_index: u32,

    // Response coding
    /// Maximum classes for an integer/numeric classification response
    pub max_integer_classes: usize,
    /// Buckets used to code a regression response
    pub n_regression_buckets: usize,

    // Device configuration
    /// Backend (CPU, GPU or hybrid)
    pub device_type: DeviceType,
    /// Number of worker threads
    pub num_threads: usize,
    /// Accelerator chunk size in rows (multiple of 64)
    pub gpu_block_size: usize,
    /// Hybrid backend: nodes with more rows than this go to the accelerator
    pub hybrid_threshold: usize,
    /// Accelerator device to use
    pub gpu_device_id: i32,

    // Output control
    /// Verbosity level for logging
    pub verbosity: VerbosityLevel,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            task: TaskType::default(),
            criterion: None,
            vote_method: VoteMethod::default(),

            num_trees: DEFAULT_NUM_TREES,
            max_depth: DEFAULT_MAX_DEPTH,
            min_node_size: DEFAULT_MIN_NODE_SIZE,
            features_per_split: 0,

            replace: true,
            sample_fraction: 1.0,
            random_seed: DEFAULT_RANDOM_SEED,

            n_numeric_cuts: DEFAULT_NUMERIC_CUTS,
            n_integer_cuts: DEFAULT_INTEGER_CUTS,
            factor_start_index: 0,

            max_integer_classes: DEFAULT_MAX_INTEGER_CLASSES,
            n_regression_buckets: DEFAULT_REGRESSION_BUCKETS,

            device_type: DeviceType::CPU,
            num_threads: num_cpus::get(),
            gpu_block_size: DEFAULT_GPU_BLOCK_SIZE,
            hybrid_threshold: DEFAULT_HYBRID_THRESHOLD,
            gpu_device_id: 0,

            verbosity: DEFAULT_VERBOSITY,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.num_trees > 0,
            BitForestError::invalid_parameter("num_trees", "0", "must be at least 1")
        );

        ensure!(
            self.num_threads > 0,
            BitForestError::invalid_parameter("num_threads", "0", "must be at least 1")
        );
        if self.num_threads > num_cpus::get() * 4 {
            log::warn!(
                "num_threads ({}) is much larger than available cores ({})",
                self.num_threads,
                num_cpus::get()
            );
        }

        ensure!(
            (1..=MAX_DEPTH).contains(&self.max_depth),
            BitForestError::invalid_parameter(
                "max_depth",
                self.max_depth.to_string(),
                format!("must be in range [1, {}]", MAX_DEPTH),
            )
        );

        ensure!(
            self.min_node_size > 0,
            BitForestError::invalid_parameter("min_node_size", "0", "must be at least 1")
        );

        ensure!(
            self.gpu_block_size > 0 && self.gpu_block_size % BITS_PER_BLOCK == 0,
            BitForestError::invalid_parameter(
                "gpu_block_size",
                self.gpu_block_size.to_string(),
                format!("must be a positive multiple of {}", BITS_PER_BLOCK),
            )
        );

        for (name, value) in [
            ("n_numeric_cuts", self.n_numeric_cuts),
            ("n_integer_cuts", self.n_integer_cuts),
            ("max_integer_classes", self.max_integer_classes),
            ("n_regression_buckets", self.n_regression_buckets),
        ] {
            ensure!(
                value >= 2,
                BitForestError::invalid_parameter(name, value.to_string(), "must be at least 2")
            );
        }

        ensure!(
            self.sample_fraction > 0.0 && self.sample_fraction <= 1.0,
            BitForestError::invalid_parameter(
                "sample_fraction",
                self.sample_fraction.to_string(),
                "must be in range (0.0, 1.0]",
            )
        );

        ensure!(
            self.factor_start_index <= 1,
            BitForestError::invalid_parameter(
                "factor_start_index",
                self.factor_start_index.to_string(),
                "must be 0 or 1",
            )
        );

        ensure!(
            !(self.task == TaskType::Classification
                && self.criterion == Some(SplitCriterion::Variance)),
            BitForestError::invalid_parameter(
                "criterion",
                "variance",
                "is only valid for regression",
            )
        );

        ensure!(
            self.device_type == DeviceType::CPU || self.gpu_device_id >= 0,
            BitForestError::invalid_parameter(
                "gpu_device_id",
                self.gpu_device_id.to_string(),
                "must be >= 0",
            )
        );

        Ok(())
    }

    /// Criterion in effect for this configuration.
    pub fn effective_criterion(&self) -> SplitCriterion {
        self.criterion
            .unwrap_or_else(|| SplitCriterion::default_for(self.task))
    }

    /// Variables sampled per split for `num_vars` predictors.
    pub fn effective_features_per_split(&self, num_vars: usize) -> usize {
        if num_vars == 0 {
            return 0;
        }
        if self.features_per_split == 0 {
            return ((num_vars as f64).sqrt().floor() as usize).max(1);
        }
        if self.features_per_split > num_vars {
            log::warn!(
                "features_per_split ({}) exceeds the number of predictors ({}), using {}",
                self.features_per_split,
                num_vars,
                num_vars
            );
            return num_vars;
        }
        self.features_per_split
    }

    /// Backend settings grouped for the forest builder.
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            device_type: self.device_type,
            num_threads: self.num_threads,
            gpu_block_size: self.gpu_block_size,
            hybrid_threshold: self.hybrid_threshold,
            gpu_device_id: self.gpu_device_id,
        }
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_error!("Failed to read config file: {}", e))?;

        let config: Config = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                config_error!("Failed to parse JSON config: {}", e)
            })?,
            Some("toml") => toml::from_str(&content).map_err(|e| {
                config_error!("Failed to parse TOML config: {}", e)
            })?,
            _ => {
                return Err(config_error!(
                    "Unsupported config file format. Use .json or .toml"
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a `.toml` or `.json` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self).map_err(|e| {
                config_error!("Failed to serialize to JSON: {}", e)
            })?,
            Some("toml") => toml::to_string_pretty(self).map_err(|e| {
                config_error!("Failed to serialize to TOML: {}", e)
            })?,
            _ => {
                return Err(config_error!(
                    "Unsupported config file format. Use .json or .toml"
                ))
            }
        };

        std::fs::write(path, content)
            .map_err(|e| config_error!("Failed to write config file: {}", e))?;

        Ok(())
    }

    /// Load configuration from `BITFOREST_*` environment variables
    pub fn load_from_environment() -> Result<Self> {
        let mut config = Config::default();
        config.apply_environment_overrides()?;
        Ok(config)
    }

    /// Apply `BITFOREST_*` environment variables on top of this configuration
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, key/value file, ...).
    ///
    /// Nothing is changed unless every override parses and the result validates.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, val: &str) -> Result<T> {
            val.trim()
                .parse()
                .map_err(|_| config_error!("Invalid {}: '{}'", key, val))
        }

        let mut next = self.clone();
        if let Some(val) = lookup("BITFOREST_NUM_TREES") {
            next.num_trees = parse("BITFOREST_NUM_TREES", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_MAX_DEPTH") {
            next.max_depth = parse("BITFOREST_MAX_DEPTH", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_MIN_NODE_SIZE") {
            next.min_node_size = parse("BITFOREST_MIN_NODE_SIZE", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_FEATURES_PER_SPLIT") {
            next.features_per_split = parse("BITFOREST_FEATURES_PER_SPLIT", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_NUM_THREADS") {
            next.num_threads = parse("BITFOREST_NUM_THREADS", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_RANDOM_SEED") {
            next.random_seed = parse("BITFOREST_RANDOM_SEED", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_GPU_BLOCK_SIZE") {
            next.gpu_block_size = parse("BITFOREST_GPU_BLOCK_SIZE", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_HYBRID_THRESHOLD") {
            next.hybrid_threshold = parse("BITFOREST_HYBRID_THRESHOLD", &val)?;
        }
        if let Some(val) = lookup("BITFOREST_DEVICE") {
            next.device_type = match val.trim() {
                "0" | "cpu" => DeviceType::CPU,
                "1" | "gpu" => DeviceType::GPU,
                "2" | "hybrid" => DeviceType::Hybrid,
                _ => return Err(config_error!("Invalid BITFOREST_DEVICE")),
            };
        }
        if let Some(val) = lookup("BITFOREST_TASK") {
            next.task = match val.trim() {
                "regression" => TaskType::Regression,
                "classification" => TaskType::Classification,
                _ => return Err(config_error!("Invalid BITFOREST_TASK")),
            };
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Get configuration as a parameter map (for debugging/serialization)
    pub fn as_parameter_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("task".to_string(), self.task.to_string());
        map.insert("criterion".to_string(), self.effective_criterion().to_string());
        map.insert("vote_method".to_string(), self.vote_method.to_string());
        map.insert("num_trees".to_string(), self.num_trees.to_string());
        map.insert("max_depth".to_string(), self.max_depth.to_string());
        map.insert("min_node_size".to_string(), self.min_node_size.to_string());
        map.insert(
            "features_per_split".to_string(),
            self.features_per_split.to_string(),
        );
        map.insert("replace".to_string(), self.replace.to_string());
        map.insert(
            "sample_fraction".to_string(),
            self.sample_fraction.to_string(),
        );
        map.insert("n_numeric_cuts".to_string(), self.n_numeric_cuts.to_string());
        map.insert("n_integer_cuts".to_string(), self.n_integer_cuts.to_string());
        map.insert(
            "max_integer_classes".to_string(),
            self.max_integer_classes.to_string(),
        );
        map.insert("device_type".to_string(), self.device_type.to_string());
        map.insert("num_threads".to_string(), self.num_threads.to_string());
        map.insert("gpu_block_size".to_string(), self.gpu_block_size.to_string());
        map.insert(
            "hybrid_threshold".to_string(),
            self.hybrid_threshold.to_string(),
        );
        map.insert("random_seed".to_string(), self.random_seed.to_string());

        map
    }
}

/// Configuration builder for fluent configuration creation
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Set the learning task
    pub fn task(mut self, task: TaskType) -> Self {
        self.config.task = task;
        self
    }

    /// Set the split criterion
    pub fn criterion(mut self, criterion: SplitCriterion) -> Self {
        self.config.criterion = Some(criterion);
        self
    }

    /// Set the vote method
    pub fn vote_method(mut self, vote_method: VoteMethod) -> Self {
        self.config.vote_method = vote_method;
        self
    }

    /// Set the number of trees
    pub fn num_trees(mut self, num_trees: usize) -> Self {
        self.config.num_trees = num_trees;
        self
    }

    /// Set the maximum tree depth
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the minimum node size
    pub fn min_node_size(mut self, min_node_size: usize) -> Self {
        self.config.min_node_size = min_node_size;
        self
    }

    /// Set the number of variables sampled per split
    pub fn features_per_split(mut self, features_per_split: usize) -> Self {
        self.config.features_per_split = features_per_split;
        self
    }

    /// Sample with or without replacement
    pub fn replace(mut self, replace: bool) -> Self {
        self.config.replace = replace;
        self
    }

    /// Set the per-tree sample fraction
    pub fn sample_fraction(mut self, sample_fraction: f64) -> Self {
        self.config.sample_fraction = sample_fraction;
        self
    }

    /// Set the random seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Set the number of cuts for numeric predictors
    pub fn n_numeric_cuts(mut self, n: usize) -> Self {
        self.config.n_numeric_cuts = n;
        self
    }

    /// Set the number of cuts for integer predictors
    pub fn n_integer_cuts(mut self, n: usize) -> Self {
        self.config.n_integer_cuts = n;
        self
    }

    /// Set the first factor code
    pub fn factor_start_index(mut self, start: u32) -> Self {
        self.config.factor_start_index = start;
        self
    }

    /// Set the maximum number of integer classes
    pub fn max_integer_classes(mut self, n: usize) -> Self {
        self.config.max_integer_classes = n;
        self
    }

    /// Set the number of regression buckets
    pub fn n_regression_buckets(mut self, n: usize) -> Self {
        self.config.n_regression_buckets = n;
        self
    }

    /// Set the backend
    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        self.config.device_type = device_type;
        self
    }

    /// Set the number of threads
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.config.num_threads = num_threads;
        self
    }

    /// Set the accelerator block size
    pub fn gpu_block_size(mut self, block_size: usize) -> Self {
        self.config.gpu_block_size = block_size;
        self
    }

    /// Set the hybrid routing threshold
    pub fn hybrid_threshold(mut self, threshold: usize) -> Self {
        self.config.hybrid_threshold = threshold;
        self
    }

    /// Set the accelerator device
    pub fn gpu_device_id(mut self, device_id: i32) -> Self {
        self.config.gpu_device_id = device_id;
        self
    }

    /// Set the verbosity level
    pub fn verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_criterion(), SplitCriterion::Gini);
    }

    #[test]
    fn test_block_size_must_be_multiple_of_64() {
        let err = ConfigBuilder::new().gpu_block_size(100).build().unwrap_err();
        assert!(matches!(
            err,
            BitForestError::InvalidParameter { ref parameter, .. } if parameter == "gpu_block_size"
        ));
        assert!(ConfigBuilder::new().gpu_block_size(128).build().is_ok());
        assert!(ConfigBuilder::new().gpu_block_size(0).build().is_err());
    }

    #[test]
    fn test_depth_bound() {
        assert!(ConfigBuilder::new().max_depth(MAX_DEPTH).build().is_ok());
        assert!(ConfigBuilder::new().max_depth(MAX_DEPTH + 1).build().is_err());
        assert!(ConfigBuilder::new().max_depth(0).build().is_err());
    }

    #[test]
    fn test_zero_trees_and_threads_rejected() {
        assert!(ConfigBuilder::new().num_trees(0).build().is_err());
        assert!(ConfigBuilder::new().num_threads(0).build().is_err());
    }

    #[test]
    fn test_variance_requires_regression() {
        let err = ConfigBuilder::new()
            .task(TaskType::Classification)
            .criterion(SplitCriterion::Variance)
            .build();
        assert!(err.is_err());

        let config = ConfigBuilder::new()
            .task(TaskType::Regression)
            .build()
            .unwrap();
        assert_eq!(config.effective_criterion(), SplitCriterion::Variance);
    }

    #[test]
    fn test_features_per_split() {
        let config = Config::default();
        assert_eq!(config.effective_features_per_split(0), 0);
        assert_eq!(config.effective_features_per_split(1), 1);
        assert_eq!(config.effective_features_per_split(10), 3);

        let config = ConfigBuilder::new().features_per_split(5).build().unwrap();
        assert_eq!(config.effective_features_per_split(3), 3);
        assert_eq!(config.effective_features_per_split(8), 5);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "BITFOREST_NUM_TREES" => Some("7".to_string()),
                "BITFOREST_DEVICE" => Some("2".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.num_trees, 7);
        assert_eq!(config.device_type, DeviceType::Hybrid);

        let err = config.apply_overrides(|key| match key {
            "BITFOREST_GPU_BLOCK_SIZE" => Some("65".to_string()),
            _ => None,
        });
        assert!(err.is_err());
        assert_eq!(config.gpu_block_size, DEFAULT_GPU_BLOCK_SIZE);

        let err = config.apply_overrides(|key| match key {
            "BITFOREST_MAX_DEPTH" => Some("deep".to_string()),
            _ => None,
        });
        assert!(matches!(err, Err(BitForestError::Config { .. })));
    }

    #[test]
    fn test_parameter_map() {
        let map = Config::default().as_parameter_map();
        assert_eq!(map.get("device_type").map(String::as_str), Some("cpu"));
        assert_eq!(map.get("criterion").map(String::as_str), Some("gini"));
    }
}
