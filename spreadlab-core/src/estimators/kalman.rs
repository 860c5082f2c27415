//! Robust scalar Kalman filter for a latent spread equilibrium.
//!
//! State model:
//! ```text
//! x_t = F·x_{t-1} + w_t,   w_t ~ N(0, Q)
//! y_t = x_t + v_t,         v_t ~ N(0, R)
//! ```
//! F = 1.0 is a random walk; F < 1.0 makes the state itself AR(1).
//!
//! Innovations are Huber-clipped to `[-c·√S_t, c·√S_t]` before the update, so a
//! single outlier can move the estimate by at most `K·c·√S_t`.
//!
//! The per-step transition is the pure function [`step`]; [`filter`] folds it
//! over the series.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{EstimatorError, SignalEstimator, SignalSeries};

/// Estimate variance at step 0.
pub const INITIAL_VARIANCE: f64 = 1.0;

/// Filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanConfig {
    /// Process noise variance Q. Must be > 0.
    pub process_noise: f64,
    /// Observation noise variance R. Must be > 0.
    pub observation_noise: f64,
    /// State transition coefficient F.
    pub transition: f64,
    /// Huber clipping threshold in innovation std units. `None` disables clipping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub huber_c: Option<f64>,
}

/// Random-walk filter with moderate observation noise.
pub const DEFAULT_KALMAN: KalmanConfig = KalmanConfig {
    process_noise: 0.02,
    observation_noise: 0.10,
    transition: 1.0,
    huber_c: Some(3.0),
};

/// Filter used by the enhanced strategy preset.
pub const ENHANCED_KALMAN: KalmanConfig = KalmanConfig {
    process_noise: 0.02,
    observation_noise: 0.12,
    transition: 1.0,
    huber_c: Some(3.0),
};

/// Closed-form steady state of the variance recursion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteadyState {
    /// Predicted variance P̂*.
    pub prior: f64,
    /// Updated variance P*.
    pub posterior: f64,
    /// Innovation variance S* = P̂* + R.
    pub innovation: f64,
}

impl KalmanConfig {
    /// Reject parameters that would make the recursion degenerate.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if !is_positive_finite(self.process_noise) {
            return Err(EstimatorError::InvalidConfig(format!(
                "process_noise (Q) must be a finite value > 0, got {}",
                self.process_noise
            )));
        }
        if !is_positive_finite(self.observation_noise) {
            return Err(EstimatorError::InvalidConfig(format!(
                "observation_noise (R) must be a finite value > 0, got {}",
                self.observation_noise
            )));
        }
        if !self.transition.is_finite() {
            return Err(EstimatorError::InvalidConfig(format!(
                "transition (F) must be finite, got {}",
                self.transition
            )));
        }
        if let Some(c) = self.huber_c {
            if !c.is_finite() || c <= 0.0 {
                return Err(EstimatorError::InvalidConfig(format!(
                    "huber_c must be a finite value > 0 (omit it to disable clipping), got {c}"
                )));
            }
        }
        Ok(())
    }

    /// Steady state of the variance recursion.
    ///
    /// Solves `P̂² + P̂·(R(1−F²) − Q) − QR = 0` for the positive root. For
    /// F = 1 the posterior reduces to `(−Q + √(Q² + 4QR)) / 2`.
    pub fn steady_state(&self) -> SteadyState {
        let q = self.process_noise;
        let r = self.observation_noise;
        let f2 = self.transition * self.transition;
        let b = r * (1.0 - f2) - q;
        let prior = (-b + (b * b + 4.0 * q * r).sqrt()) / 2.0;
        SteadyState {
            prior,
            posterior: prior * r / (prior + r),
            innovation: prior + r,
        }
    }
}

fn is_positive_finite(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Filter state after step t.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    /// x_t
    pub estimate: f64,
    /// P_t
    pub variance: f64,
    /// S_t
    pub innovation_variance: f64,
}

impl FilterState {
    /// State at step 0: `x_0 = y_0` (0.0 if missing), `P_0 = 1.0`.
    ///
    /// There is no prediction at step 0; S_0 is reported as `P_0 + R`.
    pub fn initial(first: Option<f64>, config: &KalmanConfig) -> Self {
        Self {
            estimate: first.unwrap_or(0.0),
            variance: INITIAL_VARIANCE,
            innovation_variance: INITIAL_VARIANCE + config.observation_noise,
        }
    }
}

/// Result of one filter step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStep {
    pub state: FilterState,
    /// Innovation after clipping; `None` when the observation was missing.
    pub innovation: Option<f64>,
    /// True when the raw innovation exceeded the Huber bound.
    pub clipped: bool,
}

/// Advance the filter by one step.
///
/// `t` is only used to label numerical faults.
pub fn step(
    t: usize,
    prev: &FilterState,
    observation: Option<f64>,
    config: &KalmanConfig,
) -> Result<FilterStep, EstimatorError> {
    let f = config.transition;
    let x_pred = f * prev.estimate;
    let p_pred = f * prev.variance * f + config.process_noise;
    let s = p_pred + config.observation_noise;

    if !is_positive_finite(s) {
        return Err(EstimatorError::NonPositiveInnovationVariance { step: t, value: s });
    }

    let Some(y) = observation.filter(|y| y.is_finite()) else {
        return Ok(FilterStep {
            state: FilterState {
                estimate: x_pred,
                variance: p_pred,
                innovation_variance: s,
            },
            innovation: None,
            clipped: false,
        });
    };

    let raw = y - x_pred;
    let bound = config.huber_c.map_or(f64::INFINITY, |c| c * s.sqrt());
    let nu = raw.clamp(-bound, bound);
    let gain = p_pred / s;

    Ok(FilterStep {
        state: FilterState {
            estimate: x_pred + gain * nu,
            variance: (1.0 - gain) * p_pred,
            innovation_variance: s,
        },
        innovation: Some(nu),
        clipped: raw.abs() > bound,
    })
}

/// Per-step filter output, aligned to the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOutput {
    pub estimates: Vec<f64>,
    pub variances: Vec<f64>,
    pub innovation_variances: Vec<f64>,
    /// Steps where the innovation was Huber-clipped.
    pub clipped_steps: Vec<usize>,
}

impl FilterOutput {
    fn with_capacity(n: usize) -> Self {
        Self {
            estimates: Vec::with_capacity(n),
            variances: Vec::with_capacity(n),
            innovation_variances: Vec::with_capacity(n),
            clipped_steps: Vec::new(),
        }
    }

    fn push(&mut self, state: &FilterState) {
        self.estimates.push(state.estimate);
        self.variances.push(state.variance);
        self.innovation_variances.push(state.innovation_variance);
    }

    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Filter state at step t.
    pub fn state_at(&self, t: usize) -> Option<FilterState> {
        Some(FilterState {
            estimate: *self.estimates.get(t)?,
            variance: *self.variances.get(t)?,
            innovation_variance: *self.innovation_variances.get(t)?,
        })
    }
}

/// Run the filter over an observation sequence.
pub fn filter(values: &[Option<f64>], config: &KalmanConfig) -> Result<FilterOutput, EstimatorError> {
    config.validate()?;

    let Some(&first) = values.first() else {
        return Ok(FilterOutput::default());
    };

    let mut out = FilterOutput::with_capacity(values.len());
    let initial = FilterState::initial(first, config);
    out.push(&initial);

    values
        .iter()
        .enumerate()
        .skip(1)
        .try_fold(initial, |prev, (t, &y)| {
            let next = step(t, &prev, y, config)?;
            if next.clipped {
                trace!(step = t, innovation = ?next.innovation, "innovation clipped");
                out.clipped_steps.push(t);
            }
            out.push(&next.state);
            Ok::<_, EstimatorError>(next.state)
        })?;

    debug!(
        steps = out.len(),
        clipped = out.clipped_steps.len(),
        "kalman filter pass complete"
    );
    Ok(out)
}

/// Model-based z-score: `(y_t − x_t) / √S_t`.
///
/// Undefined at step 0 and wherever the observation is missing.
pub fn zscore(values: &[Option<f64>], output: &FilterOutput) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(t, y)| {
            if t == 0 {
                return None;
            }
            let y = (*y)?;
            let x = *output.estimates.get(t)?;
            let s = *output.innovation_variances.get(t)?;
            let z = (y - x) / s.sqrt();
            z.is_finite().then_some(z)
        })
        .collect()
}

/// Kalman filter as a `SignalEstimator`.
#[derive(Debug, Clone)]
pub struct KalmanEstimator {
    config: KalmanConfig,
    name: String,
}

impl KalmanEstimator {
    pub fn new(config: KalmanConfig) -> Result<Self, EstimatorError> {
        config.validate()?;
        Ok(Self {
            config,
            name: format!(
                "kalman_q{}_r{}_f{}",
                config.process_noise, config.observation_noise, config.transition
            ),
        })
    }
}

impl SignalEstimator for KalmanEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        1
    }

    fn estimate(&self, values: &[Option<f64>]) -> Result<SignalSeries, EstimatorError> {
        let output = filter(values, &self.config)?;
        let z = zscore(values, &output);
        Ok(SignalSeries {
            z,
            equilibrium: output.estimates.iter().copied().map(Some).collect(),
            innovation_variance: Some(output.innovation_variances),
        })
    }
}
