//! Coding of the response column into classes.
//!
//! Tree building only ever sees class indices `0..nlevels`. How a response
//! becomes classes depends on the task and the column type:
//!
//! | task           | column            | classes                                           |
//! |----------------|-------------------|---------------------------------------------------|
//! | classification | factor            | one per level, in level order                     |
//! | classification | integer / numeric | one per distinct value, or `max_integer_classes` buckets |
//! | regression     | integer / numeric | `n_regression_buckets` buckets over the raw values |
//!
//! Buckets are contiguous in sorted order and built greedily so that each
//! holds roughly `n / k` rows. Each class keeps a representative value
//! (`yavg`, the mean of its rows) used to turn per-class scores back into a
//! continuous estimate.

use crate::config::Config;
use crate::core::error::{BitForestError, DatasetError, Result};
use crate::core::types::{ClassIndex, TaskType, VarType};
use crate::dataset::factor::FactorTable;
use crate::dataset::Column;
use crate::dataset_error;
use serde::{Deserialize, Serialize};

/// Encoded response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCode {
    task: TaskType,
    source_type: VarType,
    /// Representative value of every class
    yavg: Vec<f64>,
    /// Bucket boundaries (`nlevels - 1` of them) when values were bucketed
    bucket_cuts: Vec<f64>,
    /// Header labels of the classes
    level_names: Vec<String>,
    /// Level dictionary of a factor response
    factor_table: Option<FactorTable>,
    /// Class of every training row
    #[serde(skip)]
    classes: Vec<ClassIndex>,
    /// Raw training values (regression)
    #[serde(skip)]
    values: Vec<f64>,
}

impl ResponseCode {
    /// Learning task.
    pub fn task(&self) -> TaskType {
        self.task
    }

    /// Type of the column the code was built from.
    pub fn source_type(&self) -> VarType {
        self.source_type
    }

    /// Number of classes.
    pub fn nlevels(&self) -> usize {
        self.yavg.len()
    }

    /// Representative values, one per class.
    pub fn yavg(&self) -> &[f64] {
        &self.yavg
    }

    /// Representative value of class `k`.
    pub fn representative(&self, k: ClassIndex) -> f64 {
        self.yavg[k]
    }

    /// Bucket boundaries; empty unless the values were bucketed.
    pub fn bucket_cuts(&self) -> &[f64] {
        &self.bucket_cuts
    }

    /// Whether classes are buckets of several distinct values.
    pub fn is_bucketed(&self) -> bool {
        !self.bucket_cuts.is_empty()
    }

    /// Class labels.
    pub fn level_names(&self) -> &[String] {
        &self.level_names
    }

    /// Level dictionary of a factor response.
    pub fn factor_table(&self) -> Option<&FactorTable> {
        self.factor_table.as_ref()
    }

    /// Class of each training row. Empty on a code loaded from disk.
    pub fn classes(&self) -> &[ClassIndex] {
        &self.classes
    }

    /// Raw training values of a regression response. Empty otherwise.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Whether predictions are reported as one continuous value per row.
    pub fn is_continuous(&self) -> bool {
        self.task == TaskType::Regression || self.is_bucketed()
    }

    /// Class of an ordered response value.
    pub fn class_of_value(&self, value: f64) -> Option<ClassIndex> {
        if value.is_nan() || self.source_type == VarType::Factor {
            return None;
        }
        if self.is_bucketed() {
            return Some(self.bucket_cuts.partition_point(|&cut| cut <= value));
        }
        let k = self.yavg.partition_point(|&y| y < value);
        (k < self.yavg.len() && self.yavg[k] == value).then_some(k)
    }

    /// Class of a factor response level.
    pub fn class_of_label(&self, label: &str) -> Option<ClassIndex> {
        let table = self.factor_table.as_ref()?;
        table.code_of(label).and_then(|code| table.position(code))
    }
}

/// Builds a [`ResponseCode`] from the response column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseEncoder {
    task: TaskType,
    max_integer_classes: usize,
    n_regression_buckets: usize,
    factor_start_index: u32,
}

impl ResponseEncoder {
    /// Encoder for the configured task.
    pub fn from_config(config: &Config) -> Self {
        ResponseEncoder {
            task: config.task,
            max_integer_classes: config.max_integer_classes,
            n_regression_buckets: config.n_regression_buckets,
            factor_start_index: config.factor_start_index,
        }
    }

    /// Encoder with explicit limits.
    pub fn new(task: TaskType, max_integer_classes: usize, n_regression_buckets: usize) -> Self {
        ResponseEncoder {
            task,
            max_integer_classes,
            n_regression_buckets,
            factor_start_index: 0,
        }
    }

    /// Encode `column`. Missing response values are a data error.
    pub fn encode(&self, column: &Column) -> Result<ResponseCode> {
        match (self.task, column) {
            (TaskType::Regression, Column::Factor(_)) => Err(dataset_error!(
                "regression needs a numeric or integer response"
            )),
            (TaskType::Classification, Column::Factor(values)) => self.encode_factor(values),
            (_, _) => {
                let values = ordered_values(column)?;
                let k = match self.task {
                    TaskType::Regression => self.n_regression_buckets,
                    TaskType::Classification => self.max_integer_classes,
                };
                self.encode_ordered(column.var_type(), values, k)
            }
        }
    }

    fn encode_factor(&self, values: &[Option<String>]) -> Result<ResponseCode> {
        let mut table = FactorTable::with_start_index(self.factor_start_index)?;
        let mut classes = Vec::with_capacity(values.len());
        for (row, value) in values.iter().enumerate() {
            let name = value
                .as_deref()
                .ok_or(DatasetError::MissingResponse { row })?;
            let code = table.find_or_add(name);
            classes.push((code - table.start_index()) as ClassIndex);
        }

        let yavg = (0..table.num_levels())
            .map(|pos| (table.start_index() as usize + pos) as f64)
            .collect();
        Ok(ResponseCode {
            task: TaskType::Classification,
            source_type: VarType::Factor,
            yavg,
            bucket_cuts: Vec::new(),
            level_names: table.levels().to_vec(),
            factor_table: Some(table),
            classes,
            values: Vec::new(),
        })
    }

    fn encode_ordered(
        &self,
        source_type: VarType,
        values: Vec<f64>,
        k: usize,
    ) -> Result<ResponseCode> {
        let distinct = distinct_counts(&values);
        let (yavg, bucket_cuts): (Vec<f64>, Vec<f64>) = if distinct.len() <= k {
            // One class per distinct value, represented by the value itself.
            (distinct.iter().map(|&(v, _)| v).collect(), Vec::new())
        } else {
            let buckets = equal_frequency_buckets(&distinct, k, values.len());
            let yavg = buckets
                .iter()
                .map(|b| {
                    let (sum, count) = distinct[b.clone()]
                        .iter()
                        .fold((0.0, 0usize), |(s, c), &(v, n)| (s + v * n as f64, c + n));
                    sum / count as f64
                })
                .collect();
            let cuts = buckets
                .windows(2)
                .map(|w| 0.5 * (distinct[w[0].end - 1].0 + distinct[w[1].start].0))
                .collect();
            (yavg, cuts)
        };

        let level_names = match self.task {
            TaskType::Regression => vec!["pred".to_string()],
            TaskType::Classification => yavg.iter().map(|v| format!("{}", v)).collect(),
        };

        let mut code = ResponseCode {
            task: self.task,
            source_type,
            yavg,
            bucket_cuts,
            level_names,
            factor_table: None,
            classes: Vec::new(),
            values: Vec::new(),
        };
        code.classes = values
            .iter()
            .map(|&v| {
                code.class_of_value(v).ok_or_else(|| {
                    BitForestError::internal(format!("response value {} has no class", v))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if self.task == TaskType::Regression {
            code.values = values;
        }

        log::debug!(
            "Response coded into {} classes ({})",
            code.nlevels(),
            if code.is_bucketed() { "bucketed" } else { "distinct values" }
        );
        Ok(code)
    }
}

fn ordered_values(column: &Column) -> Result<Vec<f64>> {
    let n = column.len();
    (0..n)
        .map(|row| {
            column
                .ordered_value(row)
                .ok_or_else(|| BitForestError::from(DatasetError::MissingResponse { row }))
        })
        .collect()
}

/// Sorted distinct values with their multiplicities.
fn distinct_counts(values: &[f64]) -> Vec<(f64, usize)> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut out: Vec<(f64, usize)> = Vec::new();
    for v in sorted {
        match out.last_mut() {
            Some((last, count)) if *last == v => *count += 1,
            _ => out.push((v, 1)),
        }
    }
    out
}

/// Split `distinct` (more than `k` entries) into exactly `k` contiguous
/// ranges of roughly `n / k` rows each.
fn equal_frequency_buckets(
    distinct: &[(f64, usize)],
    k: usize,
    n: usize,
) -> Vec<std::ops::Range<usize>> {
    let mut buckets = Vec::with_capacity(k);
    let mut start = 0;
    let mut cumulative = 0usize;

    for (i, &(_, count)) in distinct.iter().enumerate() {
        cumulative += count;
        let b = buckets.len();
        if b + 1 == k {
            break;
        }
        let values_left = distinct.len() - i - 1;
        let buckets_left = k - b - 1;
        if cumulative * k >= (b + 1) * n || values_left == buckets_left {
            buckets.push(start..i + 1);
            start = i + 1;
        }
    }
    buckets.push(start..distinct.len());
    buckets
}
