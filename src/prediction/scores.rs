//! Score matrix returned by prediction.

use crate::core::error::Result;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::io::Write;

/// Per-class scores, `[nlevels, num_rows]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    scores: Array2<f64>,
    level_names: Vec<String>,
    yavg: Vec<f64>,
}

impl ScoreMatrix {
    /// Wrap `scores` with the class names and representative values.
    pub fn new(scores: Array2<f64>, level_names: Vec<String>, yavg: Vec<f64>) -> Self {
        ScoreMatrix {
            scores,
            level_names,
            yavg,
        }
    }

    /// Raw scores, one row per class.
    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    /// Number of classes.
    pub fn nlevels(&self) -> usize {
        self.scores.nrows()
    }

    /// Number of scored rows.
    pub fn num_rows(&self) -> usize {
        self.scores.ncols()
    }

    /// Class labels.
    pub fn level_names(&self) -> &[String] {
        &self.level_names
    }

    /// Scores of row `row`, one per class.
    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.scores.column(row)
    }

    /// Continuous estimate per row: `sum_k score_k * yavg_k`.
    pub fn collapse(&self) -> Array1<f64> {
        let yavg = ArrayView1::from(&self.yavg[..]);
        self.scores
            .axis_iter(Axis(1))
            .map(|column| column.dot(&yavg))
            .collect()
    }

    /// Highest-scoring class per row, lowest index on ties.
    pub fn predicted_classes(&self) -> Vec<usize> {
        self.scores
            .axis_iter(Axis(1))
            .map(|column| {
                let mut best = 0;
                for (k, &s) in column.iter().enumerate() {
                    if s > column[best] {
                        best = k;
                    }
                }
                best
            })
            .collect()
    }

    /// Write a header line and one line per row. With `continuous` each row
    /// is the collapsed estimate under the header `pred`; otherwise the
    /// header holds the class labels and each row its class scores.
    pub fn write_to<W: Write>(&self, writer: &mut W, continuous: bool) -> Result<()> {
        if continuous {
            writeln!(writer, "pred")?;
            for value in self.collapse().iter() {
                writeln!(writer, "{}", value)?;
            }
        } else {
            writeln!(writer, "{}", self.level_names.join(" "))?;
            for column in self.scores.axis_iter(Axis(1)) {
                let line: Vec<String> = column.iter().map(|s| s.to_string()).collect();
                writeln!(writer, "{}", line.join(" "))?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
