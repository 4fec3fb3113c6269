//! Accelerator split evaluation.
//!
//! The accelerator is driven through a [`DeviceQueue`]: a dedicated worker
//! pool that owns the device. A node's candidate features are evaluated as a
//! chunked reduction, one work item per `gpu_block_size` rows, and the
//! per-chunk integer counts are summed once the batch completes. Integer
//! partial sums make the result independent of chunking.

use crate::config::{DeviceCapabilities, DeviceConfig};
use crate::core::bitrows::BitRows;
use crate::core::error::{BitForestError, GPUError, Result};
use crate::tree::counts::ClassCounts;
use crate::tree::split::evaluator::{EvaluatorStats, NodeMasks, SplitEvaluator};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Work queue of one accelerator device.
#[derive(Debug)]
pub struct DeviceQueue {
    device_id: i32,
    pool: ThreadPool,
}

impl DeviceQueue {
    /// Open device `device_id`.
    pub fn open(device_id: i32, lanes: usize) -> Result<Self> {
        DeviceCapabilities::probe().accelerator_available(device_id)?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(lanes.max(1))
            .thread_name(move |i| format!("bitforest-gpu{}-{}", device_id, i))
            .build()
            .map_err(|e| BitForestError::gpu(format!("device {} queue: {}", device_id, e)))?;
        log::debug!("Opened accelerator device {} with {} lanes", device_id, lanes);
        Ok(DeviceQueue { device_id, pool })
    }

    /// Device identifier.
    pub fn device_id(&self) -> i32 {
        self.device_id
    }

    /// Run `kernel` on the device and wait for it.
    pub fn submit<T, F>(&self, kernel: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        self.pool.install(kernel)
    }
}

/// Evaluates candidate splits on the accelerator in row chunks.
#[derive(Debug)]
pub struct GpuSplitEvaluator {
    queue: DeviceQueue,
    words_per_chunk: usize,
    nodes: AtomicU64,
}

impl GpuSplitEvaluator {
    /// Open the configured device. Fails if the device does not exist.
    pub fn new(device: &DeviceConfig) -> Result<Self> {
        device.validate()?;
        let queue = DeviceQueue::open(device.gpu_device_id, device.num_threads)?;
        Ok(GpuSplitEvaluator {
            queue,
            words_per_chunk: device.words_per_chunk(),
            nodes: AtomicU64::new(0),
        })
    }

    /// Words reduced by one work item.
    pub fn words_per_chunk(&self) -> usize {
        self.words_per_chunk
    }
}

impl SplitEvaluator for GpuSplitEvaluator {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn left_counts(&self, node: &NodeMasks, features: &[&BitRows]) -> Result<Vec<ClassCounts>> {
        self.nodes.fetch_add(1, Ordering::Relaxed);
        let num_blocks = node.num_blocks();
        let step = self.words_per_chunk;
        let num_chunks = num_blocks.div_ceil(step);
        let mut chunks: Vec<Range<usize>> = Vec::new();
        chunks.try_reserve_exact(num_chunks).map_err(|_| GPUError::MemoryAllocation {
            size: num_chunks * std::mem::size_of::<Range<usize>>(),
        })?;
        chunks.extend(
            (0..num_blocks)
                .step_by(step)
                .map(|start| start..(start + step).min(num_blocks)),
        );

        let counts: Vec<ClassCounts> = self.queue.submit(|| {
            features
                .par_iter()
                .map(|feature| {
                    chunks
                        .par_iter()
                        .map(|blocks| node.counts_of_in(feature, blocks.clone()))
                        .reduce(|| ClassCounts::zeros(node.nlevels()), |a, b| a.add(&b))
                })
                .collect()
        });
        Ok(counts)
    }

    fn stats(&self) -> EvaluatorStats {
        EvaluatorStats {
            cpu_nodes: 0,
            gpu_nodes: self.nodes.load(Ordering::Relaxed),
        }
    }
}
