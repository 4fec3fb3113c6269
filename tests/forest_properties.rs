//! Structural properties every trained forest must satisfy.

use bitforest::*;
use proptest::prelude::*;

mod common;
use common::*;

fn grow(frame: &DataFrame, config: &Config) -> Vec<Tree> {
    let (_, matrix, response) = prepare(frame, config);
    let (trees, _) = ForestBuilder::new(config)
        .unwrap()
        .build(&matrix, &response)
        .unwrap();
    trees
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_counts_conserved_and_bounded(
        seed in 0u64..1000,
        n in 20usize..200,
        max_depth in 1usize..8,
        min_node_size in 1usize..6,
        replace in any::<bool>(),
    ) {
        let frame = mixed_frame(n, seed);
        let config = ConfigBuilder::new()
            .num_trees(3)
            .num_threads(2)
            .max_depth(max_depth)
            .min_node_size(min_node_size)
            .replace(replace)
            .random_seed(seed)
            .build()
            .unwrap();

        for tree in grow(&frame, &config) {
            prop_assert!(tree.validate(max_depth).is_ok());
            prop_assert!(tree.depth() <= max_depth);
            prop_assert!(tree.num_nodes() <= MAX_NODES);
            for node in tree.nodes() {
                if let (Some(l), Some(r)) = (node.left_child(), node.right_child()) {
                    let sum = tree.nodes()[l].count().add(tree.nodes()[r].count());
                    prop_assert_eq!(&sum, node.count());
                }
            }
            let leaf_total: u64 = tree.leaves().iter().map(|&i| tree.nodes()[i].count().total()).sum();
            prop_assert_eq!(leaf_total, tree.root().count().total());
        }
    }

    #[test]
    fn prop_flat_walk_matches_tree_walk(seed in 0u64..1000, n in 10usize..150) {
        let frame = mixed_frame(n, seed);
        let config = test_config(4);
        let (_, matrix, response) = prepare(&frame, &config);
        let (trees, _) = ForestBuilder::new(&config).unwrap().build(&matrix, &response).unwrap();
        let flat = FlatForest::flatten(&trees, response.nlevels()).unwrap();

        for (t, tree) in trees.iter().enumerate() {
            for row in 0..matrix.num_rows() {
                prop_assert_eq!(
                    flat.leaf_counts(t, &matrix, row),
                    tree.leaf_counts(&matrix, row).as_slice()
                );
            }
        }
    }
}

#[test]
fn test_backends_make_identical_split_decisions() {
    let frame = mixed_frame(700, 7);
    let base = test_config(6);
    let (_, matrix, response) = prepare(&frame, &base);

    let build = |device_type: DeviceType, block: usize, threshold: usize| {
        let config = ConfigBuilder::new()
            .num_trees(base.num_trees)
            .max_depth(base.max_depth)
            .num_threads(base.num_threads)
            .n_numeric_cuts(base.n_numeric_cuts)
            .n_integer_cuts(base.n_integer_cuts)
            .random_seed(base.random_seed)
            .device_type(device_type)
            .gpu_block_size(block)
            .hybrid_threshold(threshold)
            .build()
            .unwrap();
        ForestBuilder::new(&config)
            .unwrap()
            .build(&matrix, &response)
            .unwrap()
    };

    let (cpu, cpu_summary) = build(DeviceType::CPU, 1024, 0);
    let (gpu, gpu_summary) = build(DeviceType::GPU, 128, 0);
    let (hybrid, hybrid_summary) = build(DeviceType::Hybrid, 64, 100);

    assert_eq!(cpu_summary.evaluations.gpu_nodes, 0);
    assert_eq!(gpu_summary.evaluations.cpu_nodes, 0);
    assert!(gpu_summary.evaluations.gpu_nodes > 0);
    assert!(hybrid_summary.evaluations.gpu_nodes > 0);
    assert!(hybrid_summary.evaluations.cpu_nodes > 0);

    for ((a, b), c) in cpu.iter().zip(&gpu).zip(&hybrid) {
        assert_eq!(a.split_sequence(), b.split_sequence());
        assert_eq!(a.split_sequence(), c.split_sequence());
        assert_eq!(a, b);
        assert_eq!(a, c);
    }
}

#[test]
fn test_forest_independent_of_thread_count() {
    let frame = mixed_frame(300, 11);
    let one = ConfigBuilder::new().num_trees(8).num_threads(1).random_seed(5).build().unwrap();
    let many = ConfigBuilder::new().num_trees(8).num_threads(4).random_seed(5).build().unwrap();
    assert_eq!(grow(&frame, &one), grow(&frame, &many));

    let other_seed = ConfigBuilder::new().num_trees(8).num_threads(4).random_seed(6).build().unwrap();
    assert_ne!(grow(&frame, &one), grow(&frame, &other_seed));
}

#[test]
fn test_binarization_is_deterministic() {
    let frame = mixed_frame(257, 3);
    let config = test_config(1);
    let table = CutTable::fit(&frame, &config).unwrap();
    let a = Binarizer::new(&table).binarize(&frame).unwrap();
    let b = Binarizer::new(&table).binarize(&frame).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.num_features(), table.num_features());
    assert_eq!(a.n_blocks() * 64 - a.n_discard_bits(), 257);
    for row in [0, 63, 64, 200, 256] {
        assert_eq!(a.row_pattern(row), b.row_pattern(row));
    }

    // Refitting the tables on the same data gives the same layout.
    let again = CutTable::fit(&frame, &config).unwrap();
    assert_eq!(table, again);
}

#[test]
fn test_prediction_is_idempotent() {
    let frame = mixed_frame(400, 21);
    let model = Model::fit(&test_config(10), &frame).unwrap();
    let test = scoring_frame(&mixed_frame(100, 22));

    let first = model.predict(&test).unwrap();
    let second = model.predict(&test).unwrap();
    assert_eq!(first, second);

    let hard = model
        .predict_with(
            &model.binarize(&test).unwrap(),
            PredictionConfig::new().with_vote_method(VoteMethod::Hard).with_num_threads(3),
        )
        .unwrap();
    for row in 0..hard.num_rows() {
        let sum: f64 = hard.row(row).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        let soft_sum: f64 = first.row(row).sum();
        assert!((soft_sum - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_forest_learns_the_signal() {
    let model = Model::fit(&test_config(25), &mixed_frame(1500, 1)).unwrap();
    let test = mixed_frame(500, 2);
    let scores = model.predict(&scoring_frame(&test)).unwrap();

    let labels = match test.response().unwrap() {
        Column::Factor(values) => values.clone(),
        _ => unreachable!(),
    };
    let correct = scores
        .predicted_classes()
        .iter()
        .zip(&labels)
        .filter(|(k, label)| {
            let label = label.as_deref().unwrap_or("");
            model.response().class_of_label(label) == Some(**k)
        })
        .count();
    assert!(correct as f64 / 500.0 > 0.85, "accuracy {}", correct as f64 / 500.0);
}
