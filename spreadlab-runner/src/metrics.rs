//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: return series, equity curve or trade list
//! in, scalar out. No dependencies on the runner, data loading or estimators.

use serde::{Deserialize, Serialize};

use spreadlab_core::domain::Position;
use spreadlab_core::engine::{ExitReason, TradeRecord};

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub annualized_return: f64,
    pub sharpe: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    pub total_return: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub avg_bars_held: f64,
    /// Fraction of steps with an open position.
    pub exposure: f64,
    pub stop_loss_exits: usize,
    pub time_stop_exits: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from a simulation's outputs.
    pub fn compute(
        returns: &[f64],
        equity: &[f64],
        positions: &[Position],
        trades: &[TradeRecord],
    ) -> Self {
        Self {
            annualized_return: annualized_return(returns),
            sharpe: sharpe_ratio(returns),
            max_drawdown: max_drawdown(equity),
            total_return: total_return(equity),
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            avg_bars_held: avg_bars_held(trades),
            exposure: exposure(positions),
            stop_loss_exits: count_exits(trades, ExitReason::StopLoss),
            time_stop_exits: count_exits(trades, ExitReason::TimeStop),
        }
    }
}

// ─── Headline metrics ───────────────────────────────────────────────

/// Annualized return: `(Π(1 + r_t))^(252/n) − 1`.
///
/// Missing (NaN) returns count as 0. Returns 0.0 for an empty series.
pub fn annualized_return(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let growth: f64 = returns.iter().map(|r| 1.0 + fill_nan(*r)).product();
    let years = returns.len() as f64 / TRADING_DAYS;
    growth.powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio: `mean(r)·252 / (std(r)·√252)`.
///
/// Unbiased (n−1) std. Returns 0.0 if std is zero (within rounding) or
/// fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let filled: Vec<f64> = returns.iter().copied().map(fill_nan).collect();
    if filled.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&filled);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&filled) * TRADING_DAYS) / (std * TRADING_DAYS.sqrt())
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// NaN gaps are forward-filled; leading gaps are skipped. Returns 0.0 if
/// equity is constant or monotonically increasing.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak: Option<f64> = None;
    let mut last = f64::NAN;
    let mut max_dd = 0.0_f64;

    for &eq in equity {
        if !eq.is_nan() {
            last = eq;
        }
        if last.is_nan() {
            continue;
        }
        let p = peak.map_or(last, |p| p.max(last));
        peak = Some(p);
        if p > 0.0 {
            max_dd = max_dd.min(last / p - 1.0);
        }
    }
    max_dd
}

// ─── Extended metrics ───────────────────────────────────────────────

/// Total return as a fraction: final / initial − 1.
pub fn total_return(equity: &[f64]) -> f64 {
    let finite: Vec<f64> = equity.iter().copied().filter(|e| e.is_finite()).collect();
    match (finite.first(), finite.last()) {
        (Some(&initial), Some(&last)) if initial > 0.0 => last / initial - 1.0,
        _ => 0.0,
    }
}

/// Fraction of trades with a positive compounded return.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Mean steps between entry and exit.
pub fn avg_bars_held(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.bars_held).sum::<usize>() as f64 / trades.len() as f64
}

/// Fraction of steps spent in a position.
pub fn exposure(positions: &[Position]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    let open = positions.iter().filter(|p| !p.is_flat()).count();
    open as f64 / positions.len() as f64
}

fn count_exits(trades: &[TradeRecord], reason: ExitReason) -> usize {
    trades.iter().filter(|t| t.exit_reason == reason).count()
}

// ─── Helpers ────────────────────────────────────────────────────────

fn fill_nan(r: f64) -> f64 {
    if r.is_nan() {
        0.0
    } else {
        r
    }
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
