//! Common test utilities for bitforest integration tests.

#![allow(dead_code)]

use bitforest::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// The eight-row example: `x = 1..=8`, `y = 0,0,0,0,1,1,1,1`.
pub fn eight_row_frame() -> DataFrame {
    DataFrame::new(
        Column::factor(&["0", "0", "0", "0", "1", "1", "1", "1"]),
        vec![Column::Numeric((1..=8).map(f64::from).collect())],
    )
    .unwrap()
}

/// Configuration matching the eight-row example.
pub fn eight_row_config() -> Config {
    ConfigBuilder::new()
        .num_trees(1)
        .max_depth(2)
        .min_node_size(1)
        .features_per_split(1)
        .n_numeric_cuts(3)
        .replace(false)
        .num_threads(1)
        .build()
        .unwrap()
}

/// Mixed-type classification frame: a numeric, an integer and a factor
/// predictor plus a noise column, with a three-class factor response
/// determined (up to 5% label noise) by the first and third predictors.
pub fn mixed_frame(n: usize, seed: u64) -> DataFrame {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let levels = ["red", "green", "blue"];

    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(-3.0..3.0)).collect();
    let k: Vec<i64> = (0..n).map(|_| rng.gen_range(0..20)).collect();
    let c: Vec<&str> = (0..n).map(|_| levels[rng.gen_range(0..3)]).collect();
    let noise: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();

    let y: Vec<&str> = (0..n)
        .map(|i| {
            let class = if rng.gen::<f64>() < 0.05 {
                rng.gen_range(0..3)
            } else if x[i] < -1.0 {
                0
            } else if c[i] == "blue" {
                1
            } else {
                2
            };
            ["a", "b", "c"][class]
        })
        .collect();

    DataFrame::new(
        Column::factor(&y),
        vec![
            Column::Numeric(x),
            Column::integer(&k),
            Column::factor(&c),
            Column::Numeric(noise),
        ],
    )
    .unwrap()
    .with_labels(vec!["x", "k", "colour", "noise"])
    .unwrap()
}

/// Regression frame with `y = 2x + small noise`.
pub fn regression_frame(n: usize, seed: u64) -> DataFrame {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + rng.gen_range(-0.1..0.1)).collect();
    DataFrame::new(Column::Numeric(y), vec![Column::Numeric(x)]).unwrap()
}

/// Default test configuration with a fixed seed.
pub fn test_config(num_trees: usize) -> Config {
    ConfigBuilder::new()
        .num_trees(num_trees)
        .max_depth(8)
        .num_threads(2)
        .n_numeric_cuts(16)
        .n_integer_cuts(8)
        .random_seed(42)
        .build()
        .unwrap()
}

/// Tables, matrix and response for `frame` under `config`.
pub fn prepare(frame: &DataFrame, config: &Config) -> (CutTable, BinarizedMatrix, ResponseCode) {
    let table = CutTable::fit(frame, config).unwrap();
    let matrix = Binarizer::new(&table).binarize(frame).unwrap();
    let response = ResponseEncoder::from_config(config)
        .encode(frame.response().unwrap())
        .unwrap();
    (table, matrix, response)
}

/// Drop the response of `frame`, keeping predictors and labels.
pub fn scoring_frame(frame: &DataFrame) -> DataFrame {
    DataFrame::predictors_only(frame.predictors().to_vec())
        .unwrap()
        .with_labels(frame.labels().to_vec())
        .unwrap()
}
