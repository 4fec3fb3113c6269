//! End-to-end scenarios with known answers.

use approx::assert_relative_eq;
use bitforest::*;

mod common;
use common::*;

#[test]
fn test_eight_row_perfect_split() {
    let frame = eight_row_frame();
    let config = eight_row_config();

    let mut model = Model::fit_trees(&config, &frame).unwrap();
    match model.cut_table().var(0) {
        VariableCuts::Ordered { cuts, .. } => {
            assert_eq!(cuts.len(), 3);
            assert_relative_eq!(cuts[1], 4.5);
        }
        other => panic!("unexpected cuts {:?}", other),
    }

    let tree = &model.trees().unwrap()[0];
    assert_eq!(tree.num_nodes(), 3);
    let rule = tree.root().split().unwrap();
    assert_eq!((rule.var, rule.bcol), (0, 0));
    let left = tree.node(tree.root().left_child().unwrap()).unwrap();
    let right = tree.node(tree.root().right_child().unwrap()).unwrap();
    assert_eq!(left.count().as_slice(), &[4, 0]);
    assert_eq!(right.count().as_slice(), &[0, 4]);
    assert_eq!(left.rulepath().len(), 1);
    assert!(left.rulepath()[0].is_left);

    model.flatten().unwrap();
    let test = DataFrame::predictors_only(vec![Column::Numeric(vec![2.0, 7.0])]).unwrap();
    let scores = model.predict(&test).unwrap();
    assert_relative_eq!(scores.scores()[[0, 0]], 1.0);
    assert_relative_eq!(scores.scores()[[1, 0]], 0.0);
    assert_relative_eq!(scores.scores()[[1, 1]], 1.0);
    assert_eq!(scores.predicted_classes(), vec![0, 1]);

    let mut out = Vec::new();
    model.write_scores(&scores, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().collect::<Vec<_>>(), vec!["0 1", "1 0", "0 1"]);
}

#[test]
fn test_constant_predictors_give_single_leaf() {
    let frame = DataFrame::new(
        Column::factor(&["0", "1", "0", "1", "0", "1", "0", "1"]),
        vec![Column::Numeric(vec![3.0; 8]), Column::integer(&[7; 8])],
    )
    .unwrap();
    let config = ConfigBuilder::new()
        .num_trees(3)
        .replace(false)
        .num_threads(1)
        .build()
        .unwrap();

    let model = Model::fit_trees(&config, &frame).unwrap();
    assert_eq!(model.n_bcols(), vec![0, 0]);
    for tree in model.trees().unwrap() {
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.root().count().as_slice(), &[4, 4]);
    }

    // With a bootstrap the single leaf still holds n weighted rows.
    let config = ConfigBuilder::new().num_trees(3).num_threads(1).build().unwrap();
    let model = Model::fit_trees(&config, &frame).unwrap();
    for tree in model.trees().unwrap() {
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.root().count().total(), 8);
    }
}

#[test]
fn test_fifty_integer_values_into_ten_buckets() {
    let values: Vec<i64> = (0..50).flat_map(|v| [v, v]).collect();
    let column = Column::integer(&values);
    let code = ResponseEncoder::new(TaskType::Classification, 10, 32)
        .encode(&column)
        .unwrap();

    assert_eq!(code.nlevels(), 10);
    assert!(code.is_bucketed());
    let mut bucket_counts = vec![0usize; 10];
    for &k in code.classes() {
        bucket_counts[k] += 1;
    }
    assert_eq!(bucket_counts.iter().sum::<usize>(), values.len());
    assert!(bucket_counts.iter().all(|&c| c == 10));

    // Buckets are contiguous in value order.
    for pair in values.windows(2) {
        let a = code.class_of_value(pair[0] as f64).unwrap();
        let b = code.class_of_value(pair[1] as f64).unwrap();
        assert!(a <= b);
    }
    assert!(code.yavg().windows(2).all(|w| w[0] < w[1]));
    assert_relative_eq!(code.yavg()[0], 2.0);
}

#[test]
fn test_regression_tracks_the_target() {
    let frame = regression_frame(400, 9);
    let config = ConfigBuilder::new()
        .task(TaskType::Regression)
        .num_trees(20)
        .num_threads(2)
        .random_seed(1)
        .build()
        .unwrap();
    let model = Model::fit(&config, &frame).unwrap();
    assert!(model.response().is_continuous());

    let test = DataFrame::predictors_only(vec![Column::Numeric(vec![1.0, 5.0, 9.0])]).unwrap();
    let scores = model.predict(&test).unwrap();
    let estimate = scores.collapse();
    for (x, y) in [1.0, 5.0, 9.0].iter().zip(estimate.iter()) {
        assert!((y - 2.0 * x).abs() < 1.5, "x = {}, estimate {}", x, y);
    }

    let mut out = Vec::new();
    model.write_scores(&scores, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "pred");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_unseen_levels_and_missing_values_score() {
    let model = Model::fit(&test_config(5), &mixed_frame(300, 4)).unwrap();
    let test = DataFrame::predictors_only(vec![
        Column::Numeric(vec![f64::NAN, 0.5]),
        Column::Integer(vec![None, Some(3)]),
        Column::factor(&["purple", "blue"]),
        Column::Numeric(vec![f64::NAN, 0.2]),
    ])
    .unwrap();

    let matrix = model.binarize(&test).unwrap();
    assert!(matrix.row_pattern(0).iter().all(|&bit| !bit));

    let scores = model.predict_binarized(&matrix).unwrap();
    for row in 0..2 {
        assert_relative_eq!(scores.row(row).sum(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_split_counts_cover_predictors() {
    let model = Model::fit(&test_config(10), &mixed_frame(500, 8)).unwrap();
    let counts = model.split_counts();
    assert_eq!(counts.len(), 4);
    // The two informative predictors are used.
    assert!(counts[0] > 0);
    assert!(counts[2] > 0);
}

#[test]
fn test_fractional_numeric_response_is_learned() {
    let frame = DataFrame::new(
        Column::Numeric(vec![0.1, 0.1, 0.1, 0.1, 0.7, 0.7, 0.7, 0.7]),
        vec![Column::Numeric((1..=8).map(f64::from).collect())],
    )
    .unwrap();
    let model = Model::fit(&eight_row_config(), &frame).unwrap();
    assert_eq!(model.response().yavg(), &[0.1, 0.7]);
    assert_eq!(model.response().classes(), &[0, 0, 0, 0, 1, 1, 1, 1]);

    let test = DataFrame::predictors_only(vec![Column::Numeric(vec![2.0, 7.0])]).unwrap();
    let scores = model.predict(&test).unwrap();
    assert_eq!(scores.predicted_classes(), vec![0, 1]);
    assert_relative_eq!(scores.collapse()[1], 0.7);
}
