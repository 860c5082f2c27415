//! Trailing-window z-score, the baseline signal.
//!
//! mean_t and std_t are the sample mean and unbiased (n−1) standard deviation
//! of the `window` observations ending at t. `z_t = (y_t − mean_t) / std_t`.
//! Undefined until a full window is available, whenever the window contains a
//! gap (a non-finite value counts as one), and when the trailing std is zero.

use serde::{Deserialize, Serialize};

use super::{EstimatorError, SignalEstimator, SignalSeries};

/// Window used by the baseline strategy preset (about half a trading year).
pub const BASELINE_WINDOW: usize = 126;

/// Relative tolerance below which a trailing std counts as zero.
const ZERO_STD_TOLERANCE: f64 = 1e-12;

/// Rolling statistics, aligned to the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingOutput {
    pub mean: Vec<Option<f64>>,
    pub std: Vec<Option<f64>>,
    pub z: Vec<Option<f64>>,
}

/// Compute trailing mean, std and z-score over `window` points.
pub fn rolling_z(values: &[Option<f64>], window: usize) -> Result<RollingOutput, EstimatorError> {
    if window < 2 {
        return Err(EstimatorError::InvalidConfig(format!(
            "rolling window must be >= 2 (unbiased std needs two points), got {window}"
        )));
    }

    let n = values.len();
    let mut out = RollingOutput {
        mean: vec![None; n],
        std: vec![None; n],
        z: vec![None; n],
    };

    if n < window {
        return Ok(out);
    }

    for t in (window - 1)..n {
        let slice = &values[(t + 1 - window)..=t];
        let Some(points) = slice
            .iter()
            .map(|v| v.filter(|y| y.is_finite()))
            .collect::<Option<Vec<f64>>>()
        else {
            continue;
        };

        let mean = points.iter().sum::<f64>() / window as f64;
        let variance = points
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (window - 1) as f64;
        let std = variance.sqrt();

        out.mean[t] = Some(mean);
        out.std[t] = Some(std);

        if std > ZERO_STD_TOLERANCE * mean.abs().max(1.0) {
            out.z[t] = Some((points[window - 1] - mean) / std);
        }
    }

    Ok(out)
}

/// Rolling z-score as a `SignalEstimator`.
#[derive(Debug, Clone)]
pub struct RollingZScore {
    window: usize,
    name: String,
}

impl RollingZScore {
    pub fn new(window: usize) -> Result<Self, EstimatorError> {
        if window < 2 {
            return Err(EstimatorError::InvalidConfig(format!(
                "rolling window must be >= 2, got {window}"
            )));
        }
        Ok(Self {
            window,
            name: format!("rolling_{window}"),
        })
    }
}

impl SignalEstimator for RollingZScore {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.window - 1
    }

    fn estimate(&self, values: &[Option<f64>]) -> Result<SignalSeries, EstimatorError> {
        let out = rolling_z(values, self.window)?;
        Ok(SignalSeries {
            z: out.z,
            equilibrium: out.mean,
            innovation_variance: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{assert_approx, DEFAULT_EPSILON};

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn rejects_degenerate_window() {
        assert!(rolling_z(&some(&[1.0, 2.0]), 0).is_err());
        assert!(rolling_z(&some(&[1.0, 2.0]), 1).is_err());
        assert!(RollingZScore::new(1).is_err());
    }

    #[test]
    fn window_3_basic() {
        let out = rolling_z(&some(&[1.0, 2.0, 3.0, 5.0]), 3).unwrap();
        assert_eq!(out.z[0], None);
        assert_eq!(out.z[1], None);
        // window [1,2,3]: mean 2, std 1, z = (3-2)/1
        assert_approx(out.mean[2].unwrap(), 2.0, DEFAULT_EPSILON);
        assert_approx(out.std[2].unwrap(), 1.0, DEFAULT_EPSILON);
        assert_approx(out.z[2].unwrap(), 1.0, DEFAULT_EPSILON);
        // window [2,3,5]: mean 10/3, var = ((4/3)^2 + (1/3)^2 + (5/3)^2)/2 = 7/3
        let mean = 10.0 / 3.0;
        let std = (7.0_f64 / 3.0).sqrt();
        assert_approx(out.z[3].unwrap(), (5.0 - mean) / std, DEFAULT_EPSILON);
    }

    #[test]
    fn gap_in_window_is_undefined() {
        let values = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(6.0)];
        let out = rolling_z(&values, 2).unwrap();
        assert_eq!(out.z[1], None);
        assert_eq!(out.z[2], None);
        assert!(out.z[3].is_some());
        assert!(out.z[4].is_some());
    }

    #[test]
    fn constant_window_is_undefined() {
        let out = rolling_z(&some(&[0.1, 0.1, 0.1, 0.1]), 3).unwrap();
        assert!(out.z.iter().all(Option::is_none));
        assert!(out.mean[2].is_some());
    }

    #[test]
    fn too_few_points_all_undefined() {
        let out = rolling_z(&some(&[1.0, 2.0]), 5).unwrap();
        assert!(out.z.iter().all(Option::is_none));
        assert_eq!(out.z.len(), 2);
    }

    #[test]
    fn estimator_uses_mean_as_equilibrium() {
        let est = RollingZScore::new(2).unwrap();
        let signal = est.estimate(&some(&[1.0, 3.0, 2.0])).unwrap();
        assert_eq!(signal.equilibrium, vec![None, Some(2.0), Some(2.5)]);
        assert!(signal.innovation_variance.is_none());
        assert_eq!(est.warmup(), 1);
        assert_eq!(est.name(), "rolling_2");
    }

    #[test]
    fn non_finite_value_is_a_gap() {
        let mut values: Vec<Option<f64>> = (0..8).map(|i| Some(i as f64)).collect();
        values[3] = Some(f64::NAN);
        let out = rolling_z(&values, 3).unwrap();

        // windows touching step 3 are undefined, not NaN
        for t in 3..=5 {
            assert_eq!(out.mean[t], None);
            assert_eq!(out.std[t], None);
            assert_eq!(out.z[t], None);
        }
        assert!(out.z[6].is_some());
        assert!(out.mean[6].is_some_and(f64::is_finite));
    }
}
