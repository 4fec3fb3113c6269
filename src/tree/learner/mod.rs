//! Tree learning.
//!
//! Node expansion within a tree is sequential; parallelism happens across
//! trees in [`crate::forest`] and across rows/chunks inside the evaluators.

pub mod serial;

pub use serial::{SerialTreeLearner, SerialTreeLearnerConfig};
