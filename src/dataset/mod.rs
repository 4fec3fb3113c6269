//! Tabular input and its binary encoding.
//!
//! A [`DataFrame`] holds typed columns with the response kept apart from the
//! predictors. The submodules turn it into what tree building consumes:
//!
//! - [`factor`]: level dictionaries for categorical columns
//! - [`cuts`]: quantile thresholds for numeric and integer columns
//! - [`binarize`]: the packed, feature-major [`BinarizedMatrix`]
//! - [`response`]: class coding of the target column

pub mod binarize;
pub mod cuts;
pub mod factor;
pub mod response;

pub use binarize::{BinarizedMatrix, Binarizer, CutTable, VariableCuts};
pub use cuts::CutFinder;
pub use factor::FactorTable;
pub use response::{ResponseCode, ResponseEncoder};

use crate::core::error::{DatasetError, Result};
use crate::core::types::VarType;

/// One typed column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Continuous values; `NaN` marks a missing value
    Numeric(Vec<f64>),
    /// Integer values; `None` marks a missing value
    Integer(Vec<Option<i64>>),
    /// Categorical values; `None` marks a missing value
    Factor(Vec<Option<String>>),
}

impl Column {
    /// Build a factor column from string slices.
    pub fn factor<S: AsRef<str>>(values: &[S]) -> Self {
        Column::Factor(
            values
                .iter()
                .map(|v| Some(v.as_ref().to_string()))
                .collect(),
        )
    }

    /// Build an integer column without missing values.
    pub fn integer(values: &[i64]) -> Self {
        Column::Integer(values.iter().map(|&v| Some(v)).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Integer(v) => v.len(),
            Column::Factor(v) => v.len(),
        }
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column type.
    pub fn var_type(&self) -> VarType {
        match self {
            Column::Numeric(_) => VarType::Numeric,
            Column::Integer(_) => VarType::Integer,
            Column::Factor(_) => VarType::Factor,
        }
    }

    /// Whether row `row` holds a missing value.
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Numeric(v) => v[row].is_nan(),
            Column::Integer(v) => v[row].is_none(),
            Column::Factor(v) => v[row].is_none(),
        }
    }

    /// Ordered value of row `row`, `None` when missing or categorical.
    pub fn ordered_value(&self, row: usize) -> Option<f64> {
        match self {
            Column::Numeric(v) if !v[row].is_nan() => Some(v[row]),
            Column::Integer(v) => v[row].map(|x| x as f64),
            _ => None,
        }
    }
}

/// A table of typed columns: an optional response plus `p` predictors.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    response: Option<Column>,
    predictors: Vec<Column>,
    labels: Vec<String>,
    num_rows: usize,
}

impl DataFrame {
    /// Training frame; every column must have the response's length.
    pub fn new(response: Column, predictors: Vec<Column>) -> Result<Self> {
        let num_rows = response.len();
        check_lengths(&predictors, num_rows)?;
        let labels = default_labels(predictors.len());
        Ok(DataFrame {
            response: Some(response),
            predictors,
            labels,
            num_rows,
        })
    }

    /// Scoring frame without a response.
    pub fn predictors_only(predictors: Vec<Column>) -> Result<Self> {
        let num_rows = predictors.first().map(Column::len).unwrap_or(0);
        check_lengths(&predictors, num_rows)?;
        let labels = default_labels(predictors.len());
        Ok(DataFrame {
            response: None,
            predictors,
            labels,
            num_rows,
        })
    }

    /// Replace the predictor labels.
    pub fn with_labels<S: Into<String>>(mut self, labels: Vec<S>) -> Result<Self> {
        if labels.len() != self.predictors.len() {
            return Err(crate::core::error::BitForestError::dimension_mismatch(
                format!("{} predictor labels", self.predictors.len()),
                format!("{} labels", labels.len()),
            ));
        }
        self.labels = labels.into_iter().map(Into::into).collect();
        Ok(self)
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of predictor columns.
    pub fn num_predictors(&self) -> usize {
        self.predictors.len()
    }

    /// Response column, if present.
    pub fn response(&self) -> Option<&Column> {
        self.response.as_ref()
    }

    /// Predictor columns.
    pub fn predictors(&self) -> &[Column] {
        &self.predictors
    }

    /// Predictor labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Predictor types in column order.
    pub fn predictor_types(&self) -> Vec<VarType> {
        self.predictors.iter().map(Column::var_type).collect()
    }

    /// Type string, one character per column with the response first when
    /// present (`"fni"` is a factor response with a numeric and an integer
    /// predictor).
    pub fn var_types(&self) -> String {
        self.response
            .iter()
            .chain(self.predictors.iter())
            .map(|c| c.var_type().code())
            .collect()
    }
}

fn check_lengths(predictors: &[Column], num_rows: usize) -> Result<()> {
    for (index, column) in predictors.iter().enumerate() {
        if column.len() != num_rows {
            return Err(DatasetError::RowCountMismatch {
                index,
                expected: num_rows,
                actual: column.len(),
            }
            .into());
        }
    }
    Ok(())
}

fn default_labels(p: usize) -> Vec<String> {
    (0..p).map(|j| format!("x{}", j)).collect()
}
