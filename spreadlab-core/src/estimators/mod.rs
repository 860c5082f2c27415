//! Signal estimators: observation series in, z-score and equilibrium out.
//!
//! Two variants implement `SignalEstimator`:
//! - `KalmanEstimator`: robust recursive filter, z-score standardized by the
//!   filter's innovation variance.
//! - `RollingZScore`: trailing-window mean and unbiased std.
//!
//! Both are pure: the same inputs and configuration always produce the same
//! output series, aligned index-for-index with the input.

pub mod kalman;
pub mod rolling;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use kalman::{
    filter, zscore, FilterOutput, FilterState, FilterStep, KalmanConfig, KalmanEstimator,
    SteadyState, DEFAULT_KALMAN, ENHANCED_KALMAN, INITIAL_VARIANCE,
};
pub use rolling::{rolling_z, RollingOutput, RollingZScore, BASELINE_WINDOW};

/// Errors from estimator configuration and numerics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("invalid estimator config: {0}")]
    InvalidConfig(String),

    #[error("non-positive innovation variance {value} at step {step}")]
    NonPositiveInnovationVariance { step: usize, value: f64 },
}

/// Output of a signal estimator, aligned to the input series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    /// Trading signal. `None` wherever inputs are undefined.
    pub z: Vec<Option<f64>>,
    /// Estimated equilibrium the spread reverts toward.
    pub equilibrium: Vec<Option<f64>>,
    /// Innovation variance S_t (filter variant only).
    pub innovation_variance: Option<Vec<f64>>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Number of steps with a defined signal.
    pub fn defined_count(&self) -> usize {
        self.z.iter().filter(|z| z.is_some()).count()
    }

    /// Deviation of each observation from the most recent available
    /// equilibrium estimate (0.0 if none is available yet).
    ///
    /// `None` where the observation itself is missing or non-finite.
    pub fn deviations(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut last_equilibrium = 0.0;
        values
            .iter()
            .enumerate()
            .map(|(t, value)| {
                if let Some(eq) = self.equilibrium.get(t).copied().flatten() {
                    last_equilibrium = eq;
                }
                value.filter(|y| y.is_finite()).map(|y| y - last_equilibrium)
            })
            .collect()
    }
}

/// A signal generator over an observation series.
///
/// Implementations must not look ahead: the output at step t may depend only
/// on observations at steps `0..=t`.
pub trait SignalEstimator: Send + Sync {
    /// Human-readable name (e.g., "kalman", "rolling_126").
    fn name(&self) -> &str;

    /// Number of leading steps that can never carry a defined signal.
    fn warmup(&self) -> usize;

    /// Run the estimator over the whole series.
    fn estimate(&self, values: &[Option<f64>]) -> Result<SignalSeries, EstimatorError>;
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for estimator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
