//! Configuration errors and backend selection.

use bitforest::*;
use std::fs;
use tempfile::TempDir;

mod common;
use common::*;

#[test]
fn test_invalid_configurations_fail_before_building() {
    let frame = eight_row_frame();
    let cases = [
        ConfigBuilder::new().gpu_block_size(100).build(),
        ConfigBuilder::new().max_depth(MAX_DEPTH + 1).build(),
        ConfigBuilder::new().num_trees(0).build(),
        ConfigBuilder::new().num_threads(0).build(),
        ConfigBuilder::new().sample_fraction(0.0).build(),
    ];
    for result in cases {
        let err = result.unwrap_err();
        assert!(matches!(err, BitForestError::InvalidParameter { .. }), "{}", err);
    }

    // A hand-edited configuration is rejected at the fit boundary too.
    let mut config = eight_row_config();
    config.gpu_block_size = 96;
    assert!(matches!(
        Model::fit(&config, &frame),
        Err(BitForestError::InvalidParameter { .. })
    ));
}

#[test]
fn test_missing_accelerator() {
    let frame = mixed_frame(200, 1);
    let gpu = ConfigBuilder::new()
        .num_trees(2)
        .device_type(DeviceType::GPU)
        .gpu_device_id(5)
        .build()
        .unwrap();
    let err = Model::fit(&gpu, &frame).unwrap_err();
    assert_eq!(err.category(), "gpu");

    // The hybrid backend falls back to the CPU instead.
    let hybrid = ConfigBuilder::new()
        .num_trees(2)
        .device_type(DeviceType::Hybrid)
        .gpu_device_id(5)
        .hybrid_threshold(0)
        .build()
        .unwrap();
    let model = Model::fit(&hybrid, &frame).unwrap();
    assert_eq!(model.ntrees(), 2);
    let summary = model.build_summary().unwrap();
    assert_eq!(summary.evaluations.gpu_nodes, 0);
    assert!(summary.evaluations.cpu_nodes > 0);
}

#[test]
fn test_device_capabilities() {
    let caps = DeviceCapabilities::probe();
    assert!(caps.num_cpu_cores >= 1);
    assert!(caps.accelerator_available(0).is_ok());
    assert!(caps.accelerator_available(-1).is_err());

    let core = capabilities();
    assert_eq!(core.bits_per_block, 64);
    assert!(init().is_ok());
    assert!(is_initialized());
    assert!(!VERSION.is_empty());
}

#[test]
fn test_config_files() {
    let dir = TempDir::new().unwrap();

    let toml_path = dir.path().join("bitforest.toml");
    fs::write(
        &toml_path,
        "num_trees = 12\nmax_depth = 6\ngpu_block_size = 256\ndevice_type = \"Hybrid\"\n",
    )
    .unwrap();
    let config = Config::load_from_file(&toml_path).unwrap();
    assert_eq!(config.num_trees, 12);
    assert_eq!(config.max_depth, 6);
    assert_eq!(config.gpu_block_size, 256);
    assert_eq!(config.device_type, DeviceType::Hybrid);
    assert_eq!(config.min_node_size, Config::default().min_node_size);

    let json_path = dir.path().join("saved.json");
    config.save_to_file(&json_path).unwrap();
    assert_eq!(Config::load_from_file(&json_path).unwrap(), config);

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "gpu_block_size = 65\n").unwrap();
    assert!(Config::load_from_file(&bad).is_err());

    assert!(Config::load_from_file(dir.path().join("config.yaml")).is_err());
}

#[test]
fn test_overrides_are_all_or_nothing() {
    let mut config = Config::default();
    let before = config.clone();
    let result = config.apply_overrides(|key| match key {
        "BITFOREST_NUM_TREES" => Some("50".to_string()),
        "BITFOREST_MAX_DEPTH" => Some("99".to_string()),
        _ => None,
    });
    assert!(result.is_err());
    assert_eq!(config, before);

    config
        .apply_overrides(|key| match key {
            "BITFOREST_NUM_TREES" => Some("50".to_string()),
            "BITFOREST_TASK" => Some("regression".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.num_trees, 50);
    assert_eq!(config.task, TaskType::Regression);
    assert_eq!(config.effective_criterion(), SplitCriterion::Variance);
}
