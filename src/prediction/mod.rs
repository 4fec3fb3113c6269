//! Prediction from flattened forests.
//!
//! - [`predictor`]: row-parallel walk of the flattened trees with hard or soft voting
//! - [`scores`]: the resulting per-class score matrix and its text output

pub mod predictor;
pub mod scores;

pub use predictor::{PredictionConfig, Predictor};
pub use scores::ScoreMatrix;
