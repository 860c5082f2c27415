//! Look-ahead contamination tests for estimators and the simulator.
//!
//! No output at step t may depend on observations at step t+1 or later.
//!
//! Method: run on a truncated series (steps 0..150) and the full series
//! (steps 0..300). Assert steps 0..150 are identical between both runs.

use spreadlab_core::engine::{simulate, ENHANCED_SIMULATOR};
use spreadlab_core::estimators::{
    KalmanEstimator, RollingZScore, SignalEstimator, DEFAULT_KALMAN,
};

/// Deterministic pseudo-random spread with gaps.
fn make_test_values(n: usize) -> Vec<Option<f64>> {
    let mut level = 0.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let shock = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
            level = 0.9 * level + shock * 0.3;
            (i % 41 != 40).then_some(level)
        })
        .collect()
}

fn assert_no_lookahead(est: &dyn SignalEstimator, full: &[Option<f64>], truncated_len: usize) {
    let truncated = &full[..truncated_len];
    let full_signal = est.estimate(full).unwrap();
    let truncated_signal = est.estimate(truncated).unwrap();

    assert_eq!(truncated_signal.len(), truncated_len, "{}", est.name());
    for t in 0..truncated_len {
        assert_eq!(
            truncated_signal.z[t],
            full_signal.z[t],
            "{}: z differs at step {t}",
            est.name()
        );
        assert_eq!(
            truncated_signal.equilibrium[t],
            full_signal.equilibrium[t],
            "{}: equilibrium differs at step {t}",
            est.name()
        );
    }
}

#[test]
fn kalman_no_lookahead() {
    let values = make_test_values(300);
    assert_no_lookahead(&KalmanEstimator::new(DEFAULT_KALMAN).unwrap(), &values, 150);
}

#[test]
fn rolling_no_lookahead() {
    let values = make_test_values(300);
    assert_no_lookahead(&RollingZScore::new(20).unwrap(), &values, 150);
}

#[test]
fn simulator_no_lookahead() {
    let values = make_test_values(300);
    let signal = KalmanEstimator::new(DEFAULT_KALMAN)
        .unwrap()
        .estimate(&values)
        .unwrap();
    let dev = signal.deviations(&values);

    let full = simulate(&signal.z, &dev, None, &ENHANCED_SIMULATOR).unwrap();
    let truncated = simulate(&signal.z[..150], &dev[..150], None, &ENHANCED_SIMULATOR).unwrap();

    assert_eq!(&full.equity[..150], truncated.equity.as_slice());
    assert_eq!(&full.positions[..150], truncated.positions.as_slice());
}
