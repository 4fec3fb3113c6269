//! Per-node routing between the CPU and the accelerator.

use crate::config::DeviceConfig;
use crate::core::bitrows::BitRows;
use crate::core::error::Result;
use crate::tree::counts::ClassCounts;
use crate::tree::split::evaluator::{CpuSplitEvaluator, EvaluatorStats, NodeMasks, SplitEvaluator};
use crate::tree::split::gpu::GpuSplitEvaluator;

/// Sends nodes with more than `threshold` rows to the accelerator and the
/// rest to the CPU. Without an accelerator every node runs on the CPU.
#[derive(Debug)]
pub struct HybridSplitEvaluator {
    cpu: CpuSplitEvaluator,
    gpu: Option<GpuSplitEvaluator>,
    threshold: usize,
}

impl HybridSplitEvaluator {
    /// Compose a CPU evaluator with the configured accelerator, falling back
    /// to CPU-only routing if the accelerator cannot be opened.
    pub fn new(device: &DeviceConfig) -> Result<Self> {
        device.validate()?;
        let gpu = match GpuSplitEvaluator::new(device) {
            Ok(gpu) => Some(gpu),
            Err(e) => {
                log::warn!("Hybrid backend falling back to CPU: {}", e);
                None
            }
        };
        Ok(HybridSplitEvaluator {
            cpu: CpuSplitEvaluator::new(),
            gpu,
            threshold: device.hybrid_threshold,
        })
    }

    /// Whether an accelerator is attached.
    pub fn has_accelerator(&self) -> bool {
        self.gpu.is_some()
    }

    /// Row threshold above which nodes go to the accelerator.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl SplitEvaluator for HybridSplitEvaluator {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn left_counts(&self, node: &NodeMasks, features: &[&BitRows]) -> Result<Vec<ClassCounts>> {
        match &self.gpu {
            Some(gpu) if node.num_rows() > self.threshold => {
                match gpu.left_counts(node, features) {
                    Err(e) if e.is_recoverable() => {
                        log::warn!("Accelerator failed on a {}-row node, using CPU: {}", node.num_rows(), e);
                        self.cpu.left_counts(node, features)
                    }
                    result => result,
                }
            }
            _ => self.cpu.left_counts(node, features),
        }
    }

    fn stats(&self) -> EvaluatorStats {
        let gpu = self.gpu.as_ref().map(|g| g.stats()).unwrap_or_default();
        self.cpu.stats().merge(gpu)
    }
}
