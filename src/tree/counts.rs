//! Per-class count vectors.

use crate::core::error::{BitForestError, Result};
use crate::core::types::ClassIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weighted occurrences per class of the rows reaching a node.
///
/// Its length is the number of response classes and never changes after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassCounts {
    counts: Vec<u64>,
}

impl ClassCounts {
    /// All-zero counts for `nlevels` classes.
    pub fn zeros(nlevels: usize) -> Self {
        ClassCounts {
            counts: vec![0; nlevels],
        }
    }

    /// Wrap an explicit vector.
    pub fn from_vec(counts: Vec<u64>) -> Self {
        ClassCounts { counts }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether there are no classes.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Counts as a slice.
    pub fn as_slice(&self) -> &[u64] {
        &self.counts
    }

    /// Mutable access for accumulation.
    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        &mut self.counts
    }

    /// Sum over classes.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Element-wise sum.
    pub fn add(&self, other: &ClassCounts) -> ClassCounts {
        debug_assert_eq!(self.len(), other.len());
        ClassCounts {
            counts: self
                .counts
                .iter()
                .zip(&other.counts)
                .map(|(a, b)| a + b)
                .collect(),
        }
    }

    /// Element-wise `self - part`; fails if `part` is not contained in `self`.
    pub fn checked_sub(&self, part: &ClassCounts) -> Result<ClassCounts> {
        if self.len() != part.len() {
            return Err(BitForestError::dimension_mismatch(
                format!("{} classes", self.len()),
                format!("{} classes", part.len()),
            ));
        }
        let counts = self
            .counts
            .iter()
            .zip(&part.counts)
            .map(|(a, b)| a.checked_sub(*b))
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(|| BitForestError::internal("child count exceeds parent count"))?;
        Ok(ClassCounts { counts })
    }

    /// Most frequent class in `counts`, lowest index on ties; `None` when
    /// every count is zero.
    pub fn plurality_of(counts: &[u64]) -> Option<ClassIndex> {
        let mut best: Option<(ClassIndex, u64)> = None;
        for (k, &c) in counts.iter().enumerate() {
            if c > 0 && best.map_or(true, |(_, b)| c > b) {
                best = Some((k, c));
            }
        }
        best.map(|(k, _)| k)
    }

    /// Whether at most one class is present (zero impurity).
    pub fn is_pure(&self) -> bool {
        self.counts.iter().filter(|&&c| c > 0).count() <= 1
    }

    /// Add the class frequencies of `counts` to `acc`; an empty leaf adds
    /// nothing.
    pub fn add_frequencies(counts: &[u64], acc: &mut [f64]) {
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return;
        }
        for (a, &c) in acc.iter_mut().zip(counts) {
            *a += c as f64 / total as f64;
        }
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (k, c) in self.counts.iter().enumerate() {
            if k > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]")
    }
}
