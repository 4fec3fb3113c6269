//! Split evaluation seam shared by every backend.
//!
//! Backends only compute left-child class counts for a batch of candidate
//! features; gain ranking and tie-breaking stay in the tree learner so every
//! backend selects splits the same way.

use crate::core::bitrows::BitRows;
use crate::core::error::Result;
use crate::core::types::ClassIndex;
use crate::tree::counts::ClassCounts;
use crate::tree::sampling::BootstrapSample;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Class-by-plane masks of one tree's sample: entry `[k][b]` holds the rows
/// of class `k` whose multiplicity has bit `b` set.
#[derive(Debug, Clone)]
pub struct SampleMasks {
    class_planes: Vec<Vec<BitRows>>,
}

impl SampleMasks {
    /// Combine per-row classes with the tree's bootstrap sample.
    pub fn new(classes: &[ClassIndex], nlevels: usize, sample: &BootstrapSample) -> Self {
        let class_planes = (0..nlevels)
            .map(|k| {
                let class_mask = BitRows::from_bools(classes.iter().map(|&c| c == k));
                sample
                    .planes()
                    .iter()
                    .map(|plane| class_mask.and(plane))
                    .collect()
            })
            .collect();
        SampleMasks { class_planes }
    }

    /// Restrict every mask to the rows of a node.
    pub fn restrict(&self, node_rows: &BitRows) -> NodeMasks {
        NodeMasks {
            class_planes: self
                .class_planes
                .iter()
                .map(|planes| planes.iter().map(|p| p.and(node_rows)).collect())
                .collect(),
            num_rows: node_rows.count_ones() as usize,
            num_blocks: node_rows.num_blocks(),
        }
    }
}

/// Class-by-plane masks restricted to the rows reaching one node.
#[derive(Debug, Clone)]
pub struct NodeMasks {
    class_planes: Vec<Vec<BitRows>>,
    num_rows: usize,
    num_blocks: usize,
}

impl NodeMasks {
    /// Distinct rows reaching the node.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Words per mask.
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Number of classes.
    pub fn nlevels(&self) -> usize {
        self.class_planes.len()
    }

    /// Weighted class counts of the node itself.
    pub fn totals(&self) -> ClassCounts {
        let mut counts = ClassCounts::zeros(self.nlevels());
        for (k, planes) in self.class_planes.iter().enumerate() {
            counts.as_mut_slice()[k] = planes
                .iter()
                .enumerate()
                .map(|(b, plane)| plane.count_ones() << b)
                .sum();
        }
        counts
    }

    /// Weighted class counts of the node rows whose `feature` bit is set.
    #[inline]
    pub fn counts_of(&self, feature: &BitRows) -> ClassCounts {
        self.counts_of_in(feature, 0..self.num_blocks)
    }

    /// As [`counts_of`](Self::counts_of), restricted to a word range.
    pub fn counts_of_in(&self, feature: &BitRows, blocks: Range<usize>) -> ClassCounts {
        let mut counts = ClassCounts::zeros(self.nlevels());
        for (k, planes) in self.class_planes.iter().enumerate() {
            counts.as_mut_slice()[k] = planes
                .iter()
                .enumerate()
                .map(|(b, plane)| plane.count_and_in(feature, blocks.clone()) << b)
                .sum();
        }
        counts
    }
}

/// Node evaluations performed per backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluatorStats {
    /// Nodes evaluated on the CPU
    pub cpu_nodes: u64,
    /// Nodes evaluated on the accelerator
    pub gpu_nodes: u64,
}

impl EvaluatorStats {
    /// Element-wise sum.
    pub fn merge(self, other: EvaluatorStats) -> EvaluatorStats {
        EvaluatorStats {
            cpu_nodes: self.cpu_nodes + other.cpu_nodes,
            gpu_nodes: self.gpu_nodes + other.gpu_nodes,
        }
    }
}

/// Computes left-child class counts for candidate features at a node.
pub trait SplitEvaluator: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &'static str;

    /// Left-child counts, one entry per feature in `features`, in order.
    fn left_counts(&self, node: &NodeMasks, features: &[&BitRows]) -> Result<Vec<ClassCounts>>;

    /// Evaluations performed so far.
    fn stats(&self) -> EvaluatorStats;
}

/// Word-wise AND + popcount on the calling thread.
#[derive(Debug, Default)]
pub struct CpuSplitEvaluator {
    nodes: AtomicU64,
}

impl CpuSplitEvaluator {
    /// Creates a CPU evaluator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SplitEvaluator for CpuSplitEvaluator {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn left_counts(&self, node: &NodeMasks, features: &[&BitRows]) -> Result<Vec<ClassCounts>> {
        self.nodes.fetch_add(1, Ordering::Relaxed);
        Ok(features.iter().map(|f| node.counts_of(f)).collect())
    }

    fn stats(&self) -> EvaluatorStats {
        EvaluatorStats {
            cpu_nodes: self.nodes.load(Ordering::Relaxed),
            gpu_nodes: 0,
        }
    }
}
