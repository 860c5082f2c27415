//! Property tests for the performance metrics.

use proptest::prelude::*;
use spreadlab_runner::metrics::{annualized_return, max_drawdown, sharpe_ratio, total_return};

fn returns_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05f64..0.05, 2..400)
}

fn equity_from(returns: &[f64]) -> Vec<f64> {
    let mut equity = Vec::with_capacity(returns.len() + 1);
    let mut e = 1.0;
    equity.push(e);
    for r in returns {
        e *= 1.0 + r;
        equity.push(e);
    }
    equity
}

proptest! {
    #[test]
    fn drawdown_is_nonpositive_and_bounded(returns in returns_strategy()) {
        let dd = max_drawdown(&equity_from(&returns));
        prop_assert!(dd <= 0.0);
        prop_assert!(dd > -1.0);
    }

    #[test]
    fn sharpe_is_scale_invariant(returns in returns_strategy(), k in 0.1f64..10.0) {
        let scaled: Vec<f64> = returns.iter().map(|r| r * k).collect();
        let a = sharpe_ratio(&returns);
        let b = sharpe_ratio(&scaled);
        if a != 0.0 && b != 0.0 {
            prop_assert!((a - b).abs() < 1e-6 * a.abs().max(1.0));
        }
    }

    #[test]
    fn annualized_return_sign_matches_total(returns in returns_strategy()) {
        let total = total_return(&equity_from(&returns));
        let annual = annualized_return(&returns);
        prop_assert!(total.signum() == annual.signum() || total.abs() < 1e-12);
    }

    #[test]
    fn nan_returns_count_as_flat(returns in returns_strategy(), idx in 0usize..400) {
        let i = idx % returns.len();
        let mut with_nan = returns.clone();
        with_nan[i] = f64::NAN;
        let mut with_zero = returns;
        with_zero[i] = 0.0;
        prop_assert_eq!(annualized_return(&with_nan), annualized_return(&with_zero));
        prop_assert_eq!(sharpe_ratio(&with_nan), sharpe_ratio(&with_zero));
    }
}
