//! Integration tests for the runner: config files and CSV data on disk,
//! both presets, injected calendars, and determinism across runs.

use std::io::Write;

use chrono::NaiveDate;
use spreadlab_core::calendar::{EventDates, NoEvents};
use spreadlab_core::domain::ObservationSeries;
use spreadlab_runner::config::{BacktestConfig, CalendarConfig};
use spreadlab_runner::data_loader::{load_observations, synthetic_spread};
use spreadlab_runner::runner::{run_backtest, run_loaded, RunError};
use spreadlab_runner::sweep::run_batch;

/// Slow oscillation with a 2.5 spike every 37 days and a gap every 29.
fn spike_value(i: usize) -> Option<f64> {
    if i % 29 == 28 {
        return None;
    }
    let spike = if i % 37 == 20 { 2.5 } else { 0.0 };
    Some(0.3 * (i as f64 * 0.1).sin() + spike)
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn write_spread_csv(dir: &tempfile::TempDir, n: usize) -> std::path::PathBuf {
    let path = dir.path().join("spread.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "date,value").unwrap();
    for i in 0..n {
        let date = start() + chrono::Duration::days(i as i64);
        match spike_value(i) {
            Some(v) => writeln!(file, "{date},{v:.6}").unwrap(),
            None => writeln!(file, "{date},").unwrap(),
        }
    }
    path
}

#[test]
fn csv_and_toml_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_spread_csv(&dir, 400);

    let config_path = dir.path().join("enhanced.toml");
    std::fs::write(&config_path, BacktestConfig::enhanced().to_toml().unwrap()).unwrap();

    let data = load_observations(&data_path).unwrap();
    let config = BacktestConfig::from_file(&config_path).unwrap();
    let result = run_loaded(&data, &config).unwrap();

    assert_eq!(result.len(), 400);
    assert!(!result.is_synthetic);
    assert_eq!(result.equity[0], 1.0);
    assert!(result.metrics.trade_count > 0, "spikes should trigger entries");

    // gaps freeze the state
    for t in (28..400).step_by(29) {
        assert_eq!(result.returns[t], 0.0);
        assert_eq!(result.equity[t], result.equity[t - 1]);
    }
}

#[test]
fn event_dates_file_blocks_entries() {
    let dir = tempfile::tempdir().unwrap();
    let data = load_observations(&write_spread_csv(&dir, 200)).unwrap();

    // block every day: no entries at all
    let events_path = dir.path().join("events.csv");
    let mut events = String::from("date\n");
    for d in data.series.dates() {
        events.push_str(&format!("{d}\n"));
    }
    std::fs::write(&events_path, events).unwrap();

    let mut config = BacktestConfig::enhanced();
    config.calendar = CalendarConfig::Dates { path: events_path };
    let result = run_loaded(&data, &config).unwrap();

    assert_eq!(result.calendar, "event_dates");
    assert_eq!(result.metrics.trade_count, 0);
    assert!(result.blocked_entries > 0);
    assert_eq!(result.final_equity(), 1.0);
}

#[test]
fn missing_event_file_is_data_error() {
    let data = synthetic_spread(3, start(), 50);
    let mut config = BacktestConfig::enhanced();
    config.calendar = CalendarConfig::Dates {
        path: "/nonexistent/events.csv".into(),
    };
    assert!(matches!(run_loaded(&data, &config), Err(RunError::Data(_))));
}

#[test]
fn injected_calendar_only_suppresses_entries() {
    let series = ObservationSeries::daily(start(), (0..300).map(spike_value).collect()).unwrap();
    let config = BacktestConfig::enhanced();

    let free = run_backtest(&series, &config, &NoEvents).unwrap();
    let first_entry = free.trades.first().map(|t| t.entry_step).unwrap();
    let blocked_date = series.dates()[first_entry];
    let blocked = run_backtest(&series, &config, &EventDates::new([blocked_date])).unwrap();

    assert_eq!(blocked.blocked_entries, 1);
    assert!(blocked.positions[first_entry].is_flat());
    // identical up to the blocked day
    assert_eq!(&free.equity[..first_entry], &blocked.equity[..first_entry]);
}

#[test]
fn runs_are_deterministic() {
    let data = synthetic_spread(99, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), 750);
    let configs = [BacktestConfig::baseline(), BacktestConfig::enhanced()];

    let first = run_batch(&data, &configs, true).unwrap();
    let second = run_batch(&data, &configs, true).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].run_id, BacktestConfig::baseline().run_id());
}

#[test]
fn equity_identity_holds_for_both_presets() {
    let data = synthetic_spread(5, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(), 600);
    for config in [BacktestConfig::baseline(), BacktestConfig::enhanced()] {
        let r = run_loaded(&data, &config).unwrap();
        for t in 1..r.len() {
            let expected = r.equity[t - 1] * (1.0 + r.returns[t]);
            assert!((r.equity[t] - expected).abs() < 1e-12, "{} step {t}", config.name);
        }
        for trade in &r.trades {
            assert_eq!(trade.bars_held, trade.exit_step - trade.entry_step);
        }
    }
}
