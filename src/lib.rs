//! # bitforest
//!
//! A random forest engine built on bit-packed binary features.
//!
//! Every predictor is expanded once into boolean features (`value < cut` for
//! numeric and integer columns, `value == level` for factors) stored one bit
//! per row. Counting the classes on either side of a candidate split then
//! reduces to word-wise AND plus population count, which is what the CPU,
//! accelerator and hybrid backends all compute.
//!
//! ## Pipeline
//!
//! raw columns → [`CutTable`] (quantile cuts and factor levels) →
//! [`Binarizer`] → [`ResponseEncoder`] → [`ForestBuilder`] →
//! [`FlatForest`] → [`Predictor`]. [`Model`] drives the whole pipeline.
//!
//! ## Quick Start
//!
//! ```rust
//! use bitforest::{Column, ConfigBuilder, DataFrame, Model};
//!
//! # fn main() -> bitforest::Result<()> {
//! let frame = DataFrame::new(
//!     Column::factor(&["0", "0", "0", "0", "1", "1", "1", "1"]),
//!     vec![Column::Numeric((1..=8).map(f64::from).collect())],
//! )?;
//!
//! let config = ConfigBuilder::new()
//!     .num_trees(1)
//!     .max_depth(2)
//!     .n_numeric_cuts(3)
//!     .replace(false)
//!     .build()?;
//!
//! let model = Model::fit(&config, &frame)?;
//! let test = DataFrame::predictors_only(vec![Column::Numeric(vec![2.0, 7.0])])?;
//! let scores = model.predict(&test)?;
//! assert_eq!(scores.predicted_classes(), vec![0, 1]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Data frames, cut tables and binarization
pub mod dataset;

// Trees, samplers and split evaluators
pub mod tree;

// Tree-parallel forest building
pub mod forest;

// Trained models and their flat layout
pub mod model;

// Prediction module
pub mod prediction;

// Re-export core functionality for convenience
pub use self::core::{
    bitrows::BitRows,
    constants::*,
    error::{BitForestError, Result},
    types::*,
};

// Re-export configuration functionality
pub use config::{load_config, Config, ConfigBuilder, DeviceCapabilities, DeviceConfig};

// Re-export dataset functionality
pub use dataset::{
    BinarizedMatrix, Binarizer, Column, CutFinder, CutTable, DataFrame, FactorTable,
    ResponseCode, ResponseEncoder, VariableCuts,
};

// Re-export tree functionality
pub use tree::{
    create_evaluator, ClassCounts, CpuSplitEvaluator, GpuSplitEvaluator, HybridSplitEvaluator,
    SplitEvaluator, Tree,
};

// Re-export forest, model and prediction functionality
pub use forest::{BuildSummary, ForestBuilder};
pub use model::{FlatForest, Model};
pub use prediction::{PredictionConfig, Predictor, ScoreMatrix};

// Version information
pub use self::core::constants::BITFOREST_VERSION as VERSION;

/// Initialize the library.
///
/// Installs an `env_logger` logger (honouring `RUST_LOG`) unless the
/// embedding application already installed one. Safe to call repeatedly.
///
/// ```rust
/// fn main() -> bitforest::Result<()> {
///     bitforest::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    core::initialize_core()
}

/// Initialize the library with the logging verbosity of `config`.
///
/// ```rust
/// use bitforest::{ConfigBuilder, VerbosityLevel};
///
/// let config = ConfigBuilder::new().verbosity(VerbosityLevel::Warning).build()?;
/// bitforest::init_with_config(&config)?;
/// assert_eq!(log::max_level(), log::LevelFilter::Warn);
/// # Ok::<(), bitforest::BitForestError>(())
/// ```
pub fn init_with_config(config: &Config) -> Result<()> {
    core::initialize_with_verbosity(config.verbosity)
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    core::is_core_initialized()
}

/// Host capabilities: CPU cores and accelerator devices.
///
/// ```rust
/// let caps = bitforest::capabilities();
/// assert!(caps.num_cpu_cores >= 1);
/// println!("{}", caps.summary());
/// ```
pub fn capabilities() -> core::CoreCapabilities {
    core::CoreCapabilities::current()
}
