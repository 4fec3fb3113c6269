//! Binarization of a data frame into packed boolean features.
//!
//! Every predictor expands into `n_bcols` binary features:
//!
//! - an ordered variable with cuts `c[0] < ... < c[m-1]` yields `m - 1`
//!   features `value < c[i]` for `i = 1..m`;
//! - a factor yields one feature `value == level` for every level except the
//!   reference (first) level, in code order.
//!
//! Missing values and unseen factor levels set every feature of their
//! variable to `false`. Each feature is stored as one [`BitRows`], so a
//! split's left count over a block of 64 rows is one AND plus a popcount.

use crate::config::Config;
use crate::core::bitrows::{blocks_required_for, discard_bits_for, BitRows};
use crate::core::error::{BitForestError, DatasetError, Result};
use crate::core::types::{BinaryFeatureIndex, VarIndex, VarType};
use crate::dataset::cuts::CutFinder;
use crate::dataset::factor::FactorTable;
use crate::dataset::{Column, DataFrame};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Thresholds or levels of one predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableCuts {
    /// Numeric or integer variable with strictly increasing cuts
    Ordered { var_type: VarType, cuts: Vec<f64> },
    /// Categorical variable with its training level dictionary
    Factor { table: FactorTable },
}

impl VariableCuts {
    /// Column type this entry was built for.
    pub fn var_type(&self) -> VarType {
        match self {
            VariableCuts::Ordered { var_type, .. } => *var_type,
            VariableCuts::Factor { .. } => VarType::Factor,
        }
    }

    /// Number of binary features generated for this variable.
    pub fn n_bcols(&self) -> usize {
        match self {
            VariableCuts::Ordered { cuts, .. } => cuts.len().saturating_sub(1),
            VariableCuts::Factor { table } => table.num_levels().saturating_sub(1),
        }
    }

    /// Human-readable rule of local feature `k`, e.g. `age < 42.5`.
    pub fn describe_feature(&self, label: &str, k: usize) -> String {
        match self {
            VariableCuts::Ordered { cuts, .. } => format!("{} < {}", label, cuts[k + 1]),
            VariableCuts::Factor { table } => format!("{} == {}", label, table.levels()[k + 1]),
        }
    }

    fn binarize_column(&self, index: usize, column: &Column) -> Result<Vec<BitRows>> {
        match (self, column) {
            (VariableCuts::Ordered { cuts, var_type }, _) if column.var_type() == *var_type => {
                let n = column.len();
                Ok(cuts
                    .iter()
                    .skip(1)
                    .map(|&cut| {
                        BitRows::from_bools(
                            (0..n).map(|row| matches!(column.ordered_value(row), Some(v) if v < cut)),
                        )
                    })
                    .collect())
            }
            (VariableCuts::Factor { table }, Column::Factor(values)) => {
                let codes = table.encode_frozen(values);
                Ok((1..table.num_levels())
                    .map(|pos| {
                        let level = table.start_index() + pos as u32;
                        BitRows::from_bools(codes.iter().map(|&code| code == level))
                    })
                    .collect())
            }
            _ => Err(DatasetError::ColumnTypeMismatch {
                index,
                expected: self.var_type().code(),
                actual: column.var_type().code(),
            }
            .into()),
        }
    }
}

/// Cut and level tables of every predictor, fixed at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutTable {
    vars: Vec<VariableCuts>,
    offsets: Vec<BinaryFeatureIndex>,
}

impl CutTable {
    /// Assemble a table from per-variable entries.
    pub fn new(vars: Vec<VariableCuts>) -> Self {
        let mut offsets = Vec::with_capacity(vars.len() + 1);
        offsets.push(0);
        for var in &vars {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + var.n_bcols());
        }
        CutTable { vars, offsets }
    }

    /// Learn cuts and factor levels from the training predictors.
    pub fn fit(frame: &DataFrame, config: &Config) -> Result<Self> {
        let finder = CutFinder::from_config(config);
        let cuts = finder.compute_all(frame.predictors());

        let mut vars = Vec::with_capacity(frame.num_predictors());
        for (column, cuts) in frame.predictors().iter().zip(cuts) {
            let entry = match column {
                Column::Factor(values) => {
                    let mut table = FactorTable::with_start_index(config.factor_start_index)?;
                    table.encode_training(values);
                    VariableCuts::Factor { table }
                }
                _ => VariableCuts::Ordered {
                    var_type: column.var_type(),
                    cuts,
                },
            };
            vars.push(entry);
        }

        let table = CutTable::new(vars);
        log::debug!(
            "Cut table: {} variables, {} binary features",
            table.num_vars(),
            table.num_features()
        );
        Ok(table)
    }

    /// Number of predictors.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Total binarized width.
    pub fn num_features(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    /// Entry of variable `var`.
    pub fn var(&self, var: VarIndex) -> &VariableCuts {
        &self.vars[var]
    }

    /// All entries.
    pub fn vars(&self) -> &[VariableCuts] {
        &self.vars
    }

    /// Binary features per variable.
    pub fn n_bcols(&self) -> Vec<usize> {
        self.vars.iter().map(VariableCuts::n_bcols).collect()
    }

    /// Global feature indices belonging to variable `var`.
    pub fn feature_range(&self, var: VarIndex) -> Range<BinaryFeatureIndex> {
        self.offsets[var]..self.offsets[var + 1]
    }

    /// Predictor types in column order.
    pub fn var_types(&self) -> Vec<VarType> {
        self.vars.iter().map(VariableCuts::var_type).collect()
    }
}

/// Packed binary design matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarizedMatrix {
    features: Vec<BitRows>,
    offsets: Vec<BinaryFeatureIndex>,
    num_rows: usize,
}

impl BinarizedMatrix {
    /// Assemble from per-variable feature groups.
    pub fn from_groups(groups: Vec<Vec<BitRows>>, num_rows: usize) -> Result<Self> {
        let mut offsets = Vec::with_capacity(groups.len() + 1);
        offsets.push(0);
        let mut features = Vec::new();
        for group in groups {
            for bits in group {
                if bits.len() != num_rows {
                    return Err(BitForestError::dimension_mismatch(
                        format!("{} rows", num_rows),
                        format!("{} rows", bits.len()),
                    ));
                }
                features.push(bits);
            }
            offsets.push(features.len());
        }
        Ok(BinarizedMatrix {
            features,
            offsets,
            num_rows,
        })
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of predictors.
    pub fn num_vars(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of binary features.
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Words per feature.
    pub fn n_blocks(&self) -> usize {
        blocks_required_for(self.num_rows)
    }

    /// Padding bits in the final word of each feature.
    pub fn n_discard_bits(&self) -> usize {
        discard_bits_for(self.num_rows)
    }

    /// Bits of feature `bcol`.
    pub fn feature(&self, bcol: BinaryFeatureIndex) -> &BitRows {
        &self.features[bcol]
    }

    /// Binary features of variable `var`.
    pub fn n_bcols(&self, var: VarIndex) -> usize {
        self.offsets[var + 1] - self.offsets[var]
    }

    /// Global index of local feature `k` of variable `var`.
    pub fn feature_index(&self, var: VarIndex, k: usize) -> BinaryFeatureIndex {
        self.offsets[var] + k
    }

    /// Bit of row `row` in local feature `k` of variable `var`.
    #[inline]
    pub fn bit(&self, var: VarIndex, k: usize, row: usize) -> bool {
        self.features[self.offsets[var] + k].get(row)
    }

    /// All feature bits of one row, in feature order.
    pub fn row_pattern(&self, row: usize) -> Vec<bool> {
        self.features.iter().map(|f| f.get(row)).collect()
    }
}

/// Applies a fixed [`CutTable`] to data frames.
#[derive(Debug, Clone, Copy)]
pub struct Binarizer<'a> {
    table: &'a CutTable,
}

impl<'a> Binarizer<'a> {
    /// Binarizer over `table`.
    pub fn new(table: &'a CutTable) -> Self {
        Binarizer { table }
    }

    /// Binarize the predictors of `frame`.
    ///
    /// The frame must present exactly the columns, in order and type, that
    /// the cut table was learned from.
    pub fn binarize(&self, frame: &DataFrame) -> Result<BinarizedMatrix> {
        if frame.num_predictors() != self.table.num_vars() {
            return Err(BitForestError::data_dimension_mismatch(format!(
                "cut table covers {} predictors, frame has {}",
                self.table.num_vars(),
                frame.num_predictors()
            )));
        }

        let groups = self
            .table
            .vars()
            .par_iter()
            .zip(frame.predictors().par_iter())
            .enumerate()
            .map(|(index, (cuts, column))| cuts.binarize_column(index, column))
            .collect::<Result<Vec<_>>>()?;

        let matrix = BinarizedMatrix::from_groups(groups, frame.num_rows())?;
        debug_assert_eq!(matrix.num_features(), self.table.num_features());
        log::debug!(
            "Binarized {} rows into {} features ({} blocks, {} discard bits)",
            matrix.num_rows(),
            matrix.num_features(),
            matrix.n_blocks(),
            matrix.n_discard_bits()
        );
        Ok(matrix)
    }
}
