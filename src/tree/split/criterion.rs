//! Impurity reduction of a candidate split.
//!
//! Gains are expressed in count units (not divided by the node size) so
//! they can be compared across candidates at the same node:
//!
//! - Gini: `sum_k l_k^2 / n_l + sum_k r_k^2 / n_r - sum_k p_k^2 / n_p`
//! - Entropy: `H(p) - H(l) - H(r)` with `H(c) = n ln n - sum_k c_k ln c_k`
//! - Variance: `SSE(p) - SSE(l) - SSE(r)` with class values taken from `yavg`

use crate::core::types::SplitCriterion;
use crate::tree::counts::ClassCounts;

/// Gain of splitting `parent` into `left` and `parent - left`.
pub fn split_gain(
    criterion: SplitCriterion,
    parent: &ClassCounts,
    left: &ClassCounts,
    right: &ClassCounts,
    yavg: &[f64],
) -> f64 {
    match criterion {
        SplitCriterion::Gini => gini_score(left) + gini_score(right) - gini_score(parent),
        SplitCriterion::Entropy => {
            weighted_entropy(parent) - weighted_entropy(left) - weighted_entropy(right)
        }
        SplitCriterion::Variance => {
            sum_squared_error(parent, yavg)
                - sum_squared_error(left, yavg)
                - sum_squared_error(right, yavg)
        }
    }
}

/// Impurity of one node in the same units as [`split_gain`].
pub fn node_impurity(criterion: SplitCriterion, counts: &ClassCounts, yavg: &[f64]) -> f64 {
    match criterion {
        SplitCriterion::Gini => counts.total() as f64 - gini_score(counts),
        SplitCriterion::Entropy => weighted_entropy(counts),
        SplitCriterion::Variance => sum_squared_error(counts, yavg),
    }
}

fn gini_score(counts: &ClassCounts) -> f64 {
    let n = counts.total();
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = counts
        .as_slice()
        .iter()
        .map(|&c| (c as f64) * (c as f64))
        .sum();
    sum_sq / n as f64
}

fn weighted_entropy(counts: &ClassCounts) -> f64 {
    let n = counts.total() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let sum: f64 = counts
        .as_slice()
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let c = c as f64;
            c * c.ln()
        })
        .sum();
    n * n.ln() - sum
}

fn sum_squared_error(counts: &ClassCounts, yavg: &[f64]) -> f64 {
    let n = counts.total() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let (sum, sum_sq) = counts
        .as_slice()
        .iter()
        .zip(yavg)
        .fold((0.0, 0.0), |(s, ss), (&c, &y)| {
            let c = c as f64;
            (s + c * y, ss + c * y * y)
        });
    (sum_sq - sum * sum / n).max(0.0)
}
