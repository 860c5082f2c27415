//! SpreadLab Runner: backtest orchestration, configuration, data loading,
//! metrics, sweeps and export.
//!
//! This crate builds on `spreadlab-core` to provide:
//! - TOML configuration with named presets and content-addressed run ids
//! - CSV observation loading and a seeded synthetic spread generator
//! - Single-backtest runner composing estimator, calendar and simulator
//! - Performance metrics over the simulated return and equity series
//! - Parallel parameter sweeps and batch runs (rayon)
//! - JSON / CSV / Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, CalendarConfig, ConfigError, EstimatorConfig, RunId};
pub use data_loader::{
    dataset_hash, load_event_dates, load_observations, synthetic_spread, LoadError, LoadedData,
};
pub use export::{
    export_json, export_steps_csv, export_trades_csv, generate_comparison, generate_report,
    import_json, load_artifacts, save_artifacts,
};
pub use metrics::PerformanceMetrics;
pub use runner::{build_calendar, run_backtest, run_loaded, BacktestResult, RunError, SCHEMA_VERSION};
pub use sweep::{run_batch, ParamGrid, ParamSweep, SweepResults};
