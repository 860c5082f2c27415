//! Parameter sweep and batch execution.
//!
//! Runs are independent and share no mutable state, so they fan out over
//! rayon. The sequential path produces identical results in the same order.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, info};

use spreadlab_core::calendar::EventCalendar;
use spreadlab_core::domain::ObservationSeries;

use crate::config::{BacktestConfig, EstimatorConfig};
use crate::data_loader::LoadedData;
use crate::runner::{build_calendar, run_backtest, run_loaded, BacktestResult, RunError};

/// Parameter grid specification.
///
/// Defines values for each parameter to sweep over. Noise axes only apply
/// to a Kalman base config; an empty axis keeps the base value.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    pub entry_thresholds: Vec<f64>,
    pub exit_thresholds: Vec<f64>,
    pub process_noises: Vec<f64>,
    pub observation_noises: Vec<f64>,
}

impl ParamGrid {
    /// Threshold grid around the preset values.
    ///
    /// Entry: 1.5, 2.0, 2.5. Exit: 0.25, 0.5, 0.75.
    pub fn thresholds_default() -> Self {
        Self {
            entry_thresholds: vec![1.5, 2.0, 2.5],
            exit_thresholds: vec![0.25, 0.5, 0.75],
            ..Self::default()
        }
    }

    /// Upper bound on the number of configurations (before filtering).
    pub fn size(&self) -> usize {
        [
            &self.entry_thresholds,
            &self.exit_thresholds,
            &self.process_noises,
            &self.observation_noises,
        ]
        .iter()
        .map(|axis| axis.len().max(1))
        .product()
    }

    /// Generates all valid configurations in the grid.
    ///
    /// Combinations with entry ≤ exit are skipped.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let entries = axis_or(&self.entry_thresholds, base.simulator.entry_threshold);
        let exits = axis_or(&self.exit_thresholds, base.simulator.exit_threshold);

        let (qs, rs) = match &base.estimator {
            EstimatorConfig::Kalman(k) => (
                axis_or(&self.process_noises, k.process_noise),
                axis_or(&self.observation_noises, k.observation_noise),
            ),
            EstimatorConfig::Rolling { .. } => (vec![f64::NAN], vec![f64::NAN]),
        };

        let mut configs = Vec::new();
        for &entry in &entries {
            for &exit in &exits {
                if entry <= exit {
                    continue;
                }
                for &q in &qs {
                    for &r in &rs {
                        let mut config = base.clone();
                        config.simulator.entry_threshold = entry;
                        config.simulator.exit_threshold = exit;
                        config.name = format!("{}_e{entry}_x{exit}", base.name);
                        if let EstimatorConfig::Kalman(k) = &mut config.estimator {
                            k.process_noise = q;
                            k.observation_noise = r;
                            config.name = format!("{}_q{q}_r{r}", config.name);
                        }
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }
}

fn axis_or(axis: &[f64], base: f64) -> Vec<f64> {
    if axis.is_empty() {
        vec![base]
    } else {
        axis.to_vec()
    }
}

/// Parameter sweep executor.
///
/// Runs backtests for all configurations in a grid against one series and
/// one calendar, optionally in parallel.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Executes a parameter sweep over the given grid.
    pub fn sweep(
        &self,
        series: &ObservationSeries,
        grid: &ParamGrid,
        base: &BacktestConfig,
        calendar: &dyn EventCalendar,
    ) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        info!(configs = configs.len(), parallel = self.parallel, "sweep started");

        let run = |config: &BacktestConfig| {
            debug!(name = %config.name, estimator = config.estimator.label(), "sweep job");
            run_backtest(series, config, calendar)
        };

        let results = if self.parallel {
            configs.par_iter().map(run).collect::<Result<Vec<_>, _>>()?
        } else {
            configs.iter().map(run).collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(results))
    }

    /// Executes a sweep on loaded data, using the base config's calendar.
    pub fn sweep_loaded(
        &self,
        data: &LoadedData,
        grid: &ParamGrid,
        base: &BacktestConfig,
    ) -> Result<SweepResults, RunError> {
        let calendar = build_calendar(&base.calendar)?;
        let mut results = self.sweep(&data.series, grid, base, calendar.as_ref())?;
        for result in &mut results.results {
            result.is_synthetic = data.is_synthetic;
        }
        Ok(results)
    }
}

/// Run several configurations on the same data, each with its own calendar.
///
/// Results come back in the order of `configs`.
pub fn run_batch(
    data: &LoadedData,
    configs: &[BacktestConfig],
    parallel: bool,
) -> Result<Vec<BacktestResult>, RunError> {
    if parallel {
        configs.par_iter().map(|c| run_loaded(data, c)).collect()
    } else {
        configs.iter().map(|c| run_loaded(data, c)).collect()
    }
}

/// Results from a parameter sweep.
#[derive(Debug, Clone)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();

        Self { results, by_run_id }
    }

    /// Returns all results in grid order.
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Gets a result by RunId.
    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Returns results sorted by Sharpe ratio (descending).
    pub fn sorted_by_sharpe(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
        sorted
    }

    /// Returns the top N results by Sharpe ratio.
    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().take(n).collect()
    }

    /// Returns the best result by Sharpe ratio.
    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().next()
    }
}
