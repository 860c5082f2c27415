//! Artifact round-trip tests: save a run directory, load it back.

use chrono::NaiveDate;
use spreadlab_runner::config::{BacktestConfig, EstimatorConfig};
use spreadlab_runner::data_loader::synthetic_spread;
use spreadlab_runner::export::{generate_report, load_artifacts, save_artifacts};
use spreadlab_runner::runner::run_loaded;

#[test]
fn save_and_load_round_trip() {
    let data = synthetic_spread(8, NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(), 300);
    let result = run_loaded(&data, &BacktestConfig::enhanced()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    for file in ["manifest.json", "steps.csv", "trades.csv", "report.md"] {
        assert!(run_dir.join(file).exists(), "missing {file}");
    }
    assert!(run_dir
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("enhanced_")));

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.trades, result.trades);
    assert_eq!(loaded.positions, result.positions);
    assert_eq!(loaded.z, result.z);
}

#[test]
fn unclipped_filter_run_reloads() {
    let data = synthetic_spread(8, NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(), 200);
    let mut config = BacktestConfig::enhanced();
    if let EstimatorConfig::Kalman(kalman) = &mut config.estimator {
        kalman.huber_c = None;
    }
    let result = run_loaded(&data, &config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();
    let loaded = load_artifacts(&run_dir).unwrap();

    assert_eq!(loaded.config, config);
    assert_eq!(loaded.run_id, result.run_id);
}

#[test]
fn load_from_empty_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_artifacts(dir.path()).is_err());
}

#[test]
fn report_flags_synthetic_data() {
    let data = synthetic_spread(8, NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(), 120);
    let result = run_loaded(&data, &BacktestConfig::baseline()).unwrap();
    let md = generate_report(&result);
    assert!(md.contains("**SYNTHETIC**"));
    assert!(md.contains("| Estimator | rolling_126 |"));
}
