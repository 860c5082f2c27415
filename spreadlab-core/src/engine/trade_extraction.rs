//! Trade extraction: pairs entry and exit transitions into round-trip trades.
//!
//! Post-processes a finished simulation. Pure function: simulation result +
//! signal + dates → trade records. A position still open on the last step is
//! closed with `ExitReason::EndOfData`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Side;

use super::state::{ExitReason, SimulationResult, Transition};

/// A round-trip trade: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,

    pub entry_step: usize,
    pub entry_date: Option<NaiveDate>,
    pub entry_z: Option<f64>,

    pub exit_step: usize,
    pub exit_date: Option<NaiveDate>,
    pub exit_z: Option<f64>,
    pub exit_reason: ExitReason,

    /// Steps between entry and exit.
    pub bars_held: usize,
    /// Compounded return over `entry_step..=exit_step`, costs included.
    pub trade_return: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.trade_return > 0.0
    }
}

struct OpenTrade {
    side: Side,
    entry_step: usize,
}

/// Extract round-trip trades from a simulation.
///
/// `z` and `dates` are optional annotations; missing or short slices leave the
/// corresponding fields `None`.
pub fn extract_trades(
    result: &SimulationResult,
    z: &[Option<f64>],
    dates: &[NaiveDate],
) -> Vec<TradeRecord> {
    let mut trades = Vec::new();
    let mut open: Option<OpenTrade> = None;

    for record in &result.transitions {
        match record.transition {
            Transition::Enter(side) => {
                open = Some(OpenTrade {
                    side,
                    entry_step: record.step,
                });
            }
            Transition::Exit { side, reason } => {
                let Some(entry) = open.take() else {
                    continue;
                };
                debug_assert_eq!(entry.side, side);
                trades.push(build_trade_record(
                    &entry,
                    record.step,
                    reason,
                    result,
                    z,
                    dates,
                ));
            }
        }
    }

    if let Some(entry) = open {
        let last = result.len().saturating_sub(1);
        trades.push(build_trade_record(
            &entry,
            last,
            ExitReason::EndOfData,
            result,
            z,
            dates,
        ));
    }

    trades
}

fn build_trade_record(
    entry: &OpenTrade,
    exit_step: usize,
    exit_reason: ExitReason,
    result: &SimulationResult,
    z: &[Option<f64>],
    dates: &[NaiveDate],
) -> TradeRecord {
    let growth = result
        .pnl
        .get(entry.entry_step..=exit_step)
        .unwrap_or_default()
        .iter()
        .fold(1.0, |acc, r| acc * (1.0 + r));

    TradeRecord {
        side: entry.side,
        entry_step: entry.entry_step,
        entry_date: dates.get(entry.entry_step).copied(),
        entry_z: z.get(entry.entry_step).copied().flatten(),
        exit_step,
        exit_date: dates.get(exit_step).copied(),
        exit_z: z.get(exit_step).copied().flatten(),
        exit_reason,
        bars_held: exit_step - entry.entry_step,
        trade_return: growth - 1.0,
    }
}
