//! Serializable backtest configuration.
//!
//! A `BacktestConfig` captures everything needed to reproduce a run: the
//! estimator variant, simulator rules and event calendar. Loaded from TOML,
//! validated up front, and hashed into a content-addressable `RunId`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use spreadlab_core::calendar::{DEFAULT_EVENT_MARGIN, DEFAULT_EVENT_SEED, DEFAULT_SKIP_RATIO};
use spreadlab_core::engine::{SimulatorConfig, BASELINE_SIMULATOR, ENHANCED_SIMULATOR};
use spreadlab_core::estimators::{
    EstimatorError, KalmanConfig, KalmanEstimator, RollingZScore, SignalEstimator,
    BASELINE_WINDOW, ENHANCED_KALMAN,
};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unknown preset '{0}' (expected 'baseline' or 'enhanced')")]
    UnknownPreset(String),
}

/// Signal estimator variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorConfig {
    /// Robust Kalman filter.
    Kalman(KalmanConfig),

    /// Trailing-window mean/std.
    Rolling { window: usize },
}

impl EstimatorConfig {
    /// Instantiate the configured estimator.
    pub fn build(&self) -> Result<Box<dyn SignalEstimator>, EstimatorError> {
        match self {
            EstimatorConfig::Kalman(cfg) => Ok(Box::new(KalmanEstimator::new(*cfg)?)),
            EstimatorConfig::Rolling { window } => Ok(Box::new(RollingZScore::new(*window)?)),
        }
    }

    /// Short label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            EstimatorConfig::Kalman(_) => "kalman",
            EstimatorConfig::Rolling { .. } => "rolling",
        }
    }
}

/// Source of entry-blocking days.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalendarConfig {
    /// Never block.
    #[default]
    None,

    /// CSV file with one `date` column of event days.
    Dates { path: PathBuf },

    /// Seeded random placeholder calendar.
    SeededRandom {
        seed: u64,
        skip_ratio: f64,
        margin: usize,
    },
}

impl CalendarConfig {
    /// Placeholder calendar used by the enhanced preset.
    pub fn seeded_default() -> Self {
        CalendarConfig::SeededRandom {
            seed: DEFAULT_EVENT_SEED,
            skip_ratio: DEFAULT_SKIP_RATIO,
            margin: DEFAULT_EVENT_MARGIN,
        }
    }
}

/// Full configuration for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    /// Human-readable run name (e.g., "baseline", "enhanced").
    pub name: String,

    pub estimator: EstimatorConfig,

    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl BacktestConfig {
    /// Rolling-window z-score, no stop-loss, no event calendar.
    pub fn baseline() -> Self {
        Self {
            name: "baseline".into(),
            estimator: EstimatorConfig::Rolling {
                window: BASELINE_WINDOW,
            },
            simulator: BASELINE_SIMULATOR,
            calendar: CalendarConfig::None,
        }
    }

    /// Kalman filter z-score, stop-loss, seeded placeholder calendar.
    pub fn enhanced() -> Self {
        Self {
            name: "enhanced".into(),
            estimator: EstimatorConfig::Kalman(ENHANCED_KALMAN),
            simulator: ENHANCED_SIMULATOR,
            calendar: CalendarConfig::seeded_default(),
        }
    }

    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "enhanced" => Ok(Self::enhanced()),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Reject invalid parameters before any computation starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.estimator {
            EstimatorConfig::Kalman(cfg) => cfg.validate().map_err(invalid)?,
            EstimatorConfig::Rolling { window } => {
                if *window < 2 {
                    return Err(ConfigError::Invalid(format!(
                        "rolling window must be >= 2, got {window}"
                    )));
                }
            }
        }

        self.simulator.validate().map_err(invalid)?;

        if let CalendarConfig::SeededRandom { skip_ratio, .. } = self.calendar {
            if !(0.0..=1.0).contains(&skip_ratio) {
                return Err(ConfigError::Invalid(format!(
                    "calendar skip_ratio must be within [0, 1], got {skip_ratio}"
                )));
            }
        }
        Ok(())
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn invalid(err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid(err.to_string())
}
