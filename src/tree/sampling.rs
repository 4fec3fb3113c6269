//! Row and variable sampling for tree growth.
//!
//! The per-tree row sample is stored as multiplicity bit planes: plane `b`
//! holds bit `b` of every row's multiplicity. The weighted size of any row
//! mask `M` is then `sum_b 2^b * popcount(M & plane_b)`, which keeps
//! bootstrap weights inside the AND + popcount evaluation path.

use crate::core::bitrows::BitRows;
use crate::core::types::VarIndex;
use rand::prelude::*;
use rand::seq::index;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Multiplicities of one tree's row sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSample {
    planes: Vec<BitRows>,
    in_bag: BitRows,
    size: u64,
}

impl BootstrapSample {
    /// Draw `round(fraction * n)` rows (at least one), with or without replacement.
    pub fn draw<R: Rng + ?Sized>(n: usize, replace: bool, fraction: f64, rng: &mut R) -> Self {
        if n == 0 {
            return Self::from_multiplicities(&[]);
        }
        let m = ((fraction * n as f64).round() as usize).clamp(1, n);
        let mut multiplicity = vec![0u32; n];
        if replace {
            for _ in 0..m {
                multiplicity[rng.gen_range(0..n)] += 1;
            }
        } else {
            for row in index::sample(rng, n, m) {
                multiplicity[row] = 1;
            }
        }
        Self::from_multiplicities(&multiplicity)
    }

    /// Every row exactly once.
    pub fn all_rows(n: usize) -> Self {
        Self::from_multiplicities(&vec![1; n])
    }

    /// Encode explicit per-row multiplicities.
    pub fn from_multiplicities(multiplicity: &[u32]) -> Self {
        let n = multiplicity.len();
        let max = multiplicity.iter().copied().max().unwrap_or(0);
        let num_planes = (u32::BITS - max.leading_zeros()) as usize;

        let planes: Vec<BitRows> = (0..num_planes)
            .map(|b| BitRows::from_bools(multiplicity.iter().map(|&m| (m >> b) & 1 == 1)))
            .collect();
        let in_bag = BitRows::from_bools(multiplicity.iter().map(|&m| m > 0));
        let size = multiplicity.iter().map(|&m| m as u64).sum();

        BootstrapSample {
            planes,
            in_bag,
            size,
        }
    }

    /// Multiplicity bit planes, least significant first.
    pub fn planes(&self) -> &[BitRows] {
        &self.planes
    }

    /// Rows drawn at least once.
    pub fn in_bag(&self) -> &BitRows {
        &self.in_bag
    }

    /// Total number of draws.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Weighted number of draws falling inside `mask`.
    pub fn weighted_count(&self, mask: &BitRows) -> u64 {
        self.planes
            .iter()
            .enumerate()
            .map(|(b, plane)| plane.count_and(mask) << b)
            .sum()
    }
}

/// Draws the variables considered at each split.
#[derive(Debug, Clone)]
pub struct FeatureSampler {
    num_vars: usize,
    per_split: usize,
}

impl FeatureSampler {
    /// Sample `per_split` of `num_vars` variables (clamped to `num_vars`).
    pub fn new(num_vars: usize, per_split: usize) -> Self {
        FeatureSampler {
            num_vars,
            per_split: per_split.min(num_vars),
        }
    }

    /// Variables sampled per split.
    pub fn per_split(&self) -> usize {
        self.per_split
    }

    /// Distinct variables in ascending order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<VarIndex> {
        if self.per_split == self.num_vars {
            return (0..self.num_vars).collect();
        }
        let mut vars = index::sample(rng, self.num_vars, self.per_split).into_vec();
        vars.sort_unstable();
        vars
    }
}

/// Deterministic generator of tree `tree_index` under `seed`.
pub fn tree_rng(seed: u64, tree_index: usize) -> Xoshiro256PlusPlus {
    let stride = crate::core::constants::TREE_SEED_STRIDE;
    Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add((tree_index as u64).wrapping_mul(stride)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planes_encode_multiplicity() {
        let sample = BootstrapSample::from_multiplicities(&[0, 1, 2, 3, 5]);
        assert_eq!(sample.planes().len(), 3);
        assert_eq!(sample.size(), 11);
        assert_eq!(sample.in_bag().count_ones(), 4);

        let all = BitRows::ones(5);
        assert_eq!(sample.weighted_count(&all), 11);
        let first_three = BitRows::from_bools([true, true, true, false, false]);
        assert_eq!(sample.weighted_count(&first_three), 3);
    }

    #[test]
    fn test_draw_with_replacement() {
        let mut rng = tree_rng(7, 0);
        let sample = BootstrapSample::draw(100, true, 1.0, &mut rng);
        assert_eq!(sample.size(), 100);
        assert_eq!(sample.weighted_count(&BitRows::ones(100)), 100);
        assert!(sample.in_bag().count_ones() <= 100);
    }

    #[test]
    fn test_draw_without_replacement() {
        let mut rng = tree_rng(7, 0);
        let sample = BootstrapSample::draw(10, false, 0.5, &mut rng);
        assert_eq!(sample.size(), 5);
        assert_eq!(sample.in_bag().count_ones(), 5);
        assert_eq!(sample.planes().len(), 1);

        let full = BootstrapSample::draw(8, false, 1.0, &mut rng);
        assert_eq!(full, BootstrapSample::all_rows(8));
    }

    #[test]
    fn test_tree_rng_is_reproducible() {
        let a: Vec<u64> = (0..4).map(|_| tree_rng(1, 3).gen()).collect();
        let b: u64 = tree_rng(1, 3).gen();
        assert!(a.iter().all(|&x| x == b));
        let c: u64 = tree_rng(1, 4).gen();
        assert_ne!(b, c);
    }

    #[test]
    fn test_feature_sampler() {
        let sampler = FeatureSampler::new(10, 3);
        let mut rng = tree_rng(0, 0);
        for _ in 0..20 {
            let vars = sampler.sample(&mut rng);
            assert_eq!(vars.len(), 3);
            assert!(vars.windows(2).all(|w| w[0] < w[1]));
            assert!(vars.iter().all(|&v| v < 10));
        }
        assert_eq!(FeatureSampler::new(2, 5).sample(&mut rng), vec![0, 1]);
    }
}
