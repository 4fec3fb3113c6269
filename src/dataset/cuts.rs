//! Candidate split thresholds for ordered columns.
//!
//! Cuts are sample quantiles (linear interpolation between order statistics)
//! at evenly spaced probabilities. Ties collapse, so the result is strictly
//! increasing; a column with fewer than two distinct cuts yields none.

use crate::config::Config;
use crate::dataset::Column;
use rayon::prelude::*;

/// Computes per-column cut arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutFinder {
    n_numeric_cuts: usize,
    n_integer_cuts: usize,
}

impl CutFinder {
    /// Create a cut finder requesting the given number of cuts per type.
    pub fn new(n_numeric_cuts: usize, n_integer_cuts: usize) -> Self {
        CutFinder {
            n_numeric_cuts,
            n_integer_cuts,
        }
    }

    /// Cut finder using the configured cut counts.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.n_numeric_cuts, config.n_integer_cuts)
    }

    /// Cuts of one column. Factor columns have no numeric cuts.
    pub fn compute_cuts(&self, column: &Column) -> Vec<f64> {
        match column {
            Column::Numeric(values) => {
                let observed: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                quantile_cuts(observed, self.n_numeric_cuts, false)
            }
            Column::Integer(values) => {
                let observed: Vec<f64> = values.iter().flatten().map(|&v| v as f64).collect();
                quantile_cuts(observed, self.n_integer_cuts, true)
            }
            Column::Factor(_) => Vec::new(),
        }
    }

    /// Cuts of every column, computed in parallel.
    pub fn compute_all(&self, columns: &[Column]) -> Vec<Vec<f64>> {
        columns
            .par_iter()
            .map(|column| self.compute_cuts(column))
            .collect()
    }
}

/// `k` quantiles of the finite `values` at probabilities `i / (k - 1)`,
/// deduplicated. Integer columns round each quantile up.
pub fn quantile_cuts(mut values: Vec<f64>, k: usize, integer: bool) -> Vec<f64> {
    values.retain(|v| v.is_finite());
    if values.is_empty() || k < 2 {
        return Vec::new();
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    let mut cuts: Vec<f64> = (0..k)
        .map(|i| {
            let h = (n - 1) as f64 * i as f64 / (k - 1) as f64;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let q = values[lo] + (h - lo as f64) * (values[hi] - values[lo]);
            if integer {
                q.ceil()
            } else {
                q
            }
        })
        .collect();
    cuts.dedup();

    if cuts.len() < 2 {
        cuts.clear();
    }
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_three_cuts_on_eight_values() {
        let finder = CutFinder::new(3, 3);
        let column = Column::Numeric((1..=8).map(|v| v as f64).collect());
        let cuts = finder.compute_cuts(&column);
        assert_eq!(cuts.len(), 3);
        assert_abs_diff_eq!(cuts[0], 1.0);
        assert_abs_diff_eq!(cuts[1], 4.5);
        assert_abs_diff_eq!(cuts[2], 8.0);
    }

    #[test]
    fn test_infinite_values_do_not_produce_nan_cuts() {
        let finder = CutFinder::new(3, 3);
        let column = Column::Numeric(vec![
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            1.0,
            2.0,
            3.0,
            f64::INFINITY,
            f64::INFINITY,
            f64::NAN,
        ]);
        let cuts = finder.compute_cuts(&column);
        assert_eq!(cuts, vec![1.0, 2.0, 3.0]);

        let cuts = quantile_cuts(vec![f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY], 4, false);
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_integer_cuts_round_up() {
        let finder = CutFinder::new(3, 3);
        let column = Column::integer(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(finder.compute_cuts(&column), vec![1.0, 5.0, 8.0]);
    }

    #[test]
    fn test_constant_column_has_no_cuts() {
        let finder = CutFinder::new(8, 8);
        assert!(finder.compute_cuts(&Column::Numeric(vec![3.0; 10])).is_empty());
        assert!(finder.compute_cuts(&Column::Numeric(vec![])).is_empty());
    }

    #[test]
    fn test_ties_collapse() {
        let values = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0];
        let cuts = quantile_cuts(values, 5, false);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(cuts.first(), Some(&1.0));
        assert_eq!(cuts.last(), Some(&3.0));
    }

    #[test]
    fn test_missing_values_ignored() {
        let finder = CutFinder::new(2, 2);
        let column = Column::Numeric(vec![f64::NAN, 1.0, 5.0, f64::NAN]);
        assert_eq!(finder.compute_cuts(&column), vec![1.0, 5.0]);
        let column = Column::Integer(vec![None, Some(2), Some(9)]);
        assert_eq!(finder.compute_cuts(&column), vec![2.0, 9.0]);
    }

    #[test]
    fn test_compute_all_skips_factors() {
        let finder = CutFinder::new(3, 3);
        let columns = vec![
            Column::factor(&["a", "b"]),
            Column::Numeric(vec![0.0, 1.0]),
        ];
        let all = finder.compute_all(&columns);
        assert!(all[0].is_empty());
        assert_eq!(all[1], vec![0.0, 0.5, 1.0]);
    }
}
