//! Split evaluation backends.
//!
//! [`SplitEvaluator`] is the one interface the tree learner sees. The CPU,
//! accelerator and hybrid implementations differ only in where the
//! AND + popcount reductions run; [`create_evaluator`] picks one from the
//! device configuration.

pub mod criterion;
pub mod evaluator;
pub mod gpu;
pub mod hybrid;

pub use criterion::{node_impurity, split_gain};
pub use evaluator::{
    CpuSplitEvaluator, EvaluatorStats, NodeMasks, SampleMasks, SplitEvaluator,
};
pub use gpu::{DeviceQueue, GpuSplitEvaluator};
pub use hybrid::HybridSplitEvaluator;

use crate::config::DeviceConfig;
use crate::core::error::Result;
use crate::core::types::DeviceType;

/// Build the evaluator selected by `device`.
///
/// The GPU backend fails if its device is missing; the hybrid backend falls
/// back to the CPU instead.
pub fn create_evaluator(device: &DeviceConfig) -> Result<Box<dyn SplitEvaluator>> {
    device.validate()?;
    let evaluator: Box<dyn SplitEvaluator> = match device.device_type {
        DeviceType::CPU => Box::new(CpuSplitEvaluator::new()),
        DeviceType::GPU => Box::new(GpuSplitEvaluator::new(device)?),
        DeviceType::Hybrid => Box::new(HybridSplitEvaluator::new(device)?),
    };
    log::debug!("Using {} split evaluator", evaluator.name());
    Ok(evaluator)
}
