//! Backtest runner: wires together estimator, event calendar, simulator,
//! trade extraction and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: takes a pre-loaded series and an injected calendar. No I/O.
//! - `run_loaded()`: takes loaded data, builds the calendar from the config
//!   (may read an event-date file) and tags synthetic provenance. Used by the CLI.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use spreadlab_core::calendar::{
    CalendarError, EventCalendar, EventDates, NoEvents, SeededRandomCalendar,
};
use spreadlab_core::domain::{ObservationSeries, Position};
use spreadlab_core::engine::{extract_trades, simulate, SimulatorError, TradeRecord};
use spreadlab_core::estimators::EstimatorError;

use crate::config::{BacktestConfig, CalendarConfig, ConfigError, RunId};
use crate::data_loader::{dataset_hash, load_event_dates, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),
    #[error("estimator error: {0}")]
    Estimator(#[from] EstimatorError),
    #[error("simulator error: {0}")]
    Simulator(#[from] SimulatorError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run. All series are aligned to the
/// input observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub estimator: String,
    pub calendar: String,
    pub dataset_hash: String,
    pub is_synthetic: bool,

    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,

    pub dates: Vec<NaiveDate>,
    pub observations: Vec<Option<f64>>,
    pub z: Vec<Option<f64>>,
    pub equilibrium: Vec<Option<f64>>,
    pub deviations: Vec<Option<f64>>,
    /// Filter variant only.
    pub innovation_variance: Option<Vec<f64>>,
    pub positions: Vec<Position>,
    pub returns: Vec<f64>,
    pub equity: Vec<f64>,
    /// Entry signals suppressed by the event calendar.
    pub blocked_entries: usize,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn len(&self) -> usize {
        self.equity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equity.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.equity.last().copied().unwrap_or(1.0)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Instantiate the event calendar a config names.
pub fn build_calendar(config: &CalendarConfig) -> Result<Box<dyn EventCalendar>, RunError> {
    Ok(match config {
        CalendarConfig::None => Box::new(NoEvents),
        CalendarConfig::Dates { path } => Box::new(EventDates::new(load_event_dates(path)?)),
        CalendarConfig::SeededRandom {
            seed,
            skip_ratio,
            margin,
        } => Box::new(SeededRandomCalendar::new(*seed, *skip_ratio, *margin)?),
    })
}

/// Run a backtest on loaded data, with the calendar the config names.
pub fn run_loaded(data: &LoadedData, config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let calendar = build_calendar(&config.calendar)?;
    let mut result = run_backtest(&data.series, config, calendar.as_ref())?;
    result.is_synthetic = data.is_synthetic;
    Ok(result)
}

/// Run a single backtest with pre-loaded data and an injected calendar. No I/O.
///
/// Purely compositional: estimate → deviation → mask → simulate → trades →
/// metrics.
pub fn run_backtest(
    series: &ObservationSeries,
    config: &BacktestConfig,
    calendar: &dyn EventCalendar,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id();
    let estimator = config.estimator.build()?;

    info!(
        run_id = %&run_id[..12],
        name = %config.name,
        estimator = estimator.name(),
        calendar = calendar.name(),
        observations = series.len(),
        "backtest started"
    );

    let dates = series.dates();
    let values = series.values();

    let signal = estimator.estimate(&values)?;
    let deviations = signal.deviations(&values);
    let mask = calendar.blocked_mask(&dates);
    debug!(
        warmup = estimator.warmup(),
        defined = signal.defined_count(),
        blocked_days = mask.iter().filter(|b| **b).count(),
        "signal ready"
    );

    let sim = simulate(&signal.z, &deviations, Some(&mask), &config.simulator)?;
    let trades = extract_trades(&sim, &signal.z, &dates);
    let metrics = PerformanceMetrics::compute(&sim.pnl, &sim.equity, &sim.positions, &trades);

    info!(
        run_id = %&run_id[..12],
        trades = metrics.trade_count,
        annualized_return = metrics.annualized_return,
        sharpe = metrics.sharpe,
        max_drawdown = metrics.max_drawdown,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        estimator: estimator.name().to_string(),
        calendar: calendar.name().to_string(),
        dataset_hash: dataset_hash(series),
        is_synthetic: false,
        metrics,
        trades,
        dates,
        observations: values,
        z: signal.z,
        equilibrium: signal.equilibrium,
        deviations,
        innovation_variance: signal.innovation_variance,
        positions: sim.positions,
        returns: sim.pnl,
        equity: sim.equity,
        blocked_entries: sim.blocked_entries,
    })
}
