//! Trade simulator: a three-state machine (Flat / Long / Short) over a
//! z-score signal.
//!
//! Per step, in order:
//! 1. Undefined signal: freeze everything, pnl = 0.
//! 2. Flat: enter when |z| ≥ entry and the day is not blocked (cost charged).
//! 3. Open: hold += 1, then stop-loss, then mean-reversion / time-stop exit
//!    (cost charged on exit).
//! 4. Still open: accrue `sign · (|dev_{t−1}| − |dev_t|) · pnl_scale`.
//! 5. equity_t = equity_{t−1} · (1 + pnl_t).
//!
//! The accrual is an illustrative proxy for a mean-reversion trade, not a
//! priced option payoff.

use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::{OpenPosition, Position, Side};

use super::state::{
    ExitReason, SimState, SimulationResult, SimulatorConfig, StepInput, StepOutput, Transition,
    TransitionRecord,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulatorError {
    #[error("invalid simulator config: {0}")]
    InvalidConfig(String),

    #[error("{series} series has length {actual}, expected {expected}")]
    LengthMismatch {
        series: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Advance the state machine by one step.
///
/// Pure: the same state, input and config always produce the same result.
pub fn step(state: &SimState, input: StepInput, config: &SimulatorConfig) -> (SimState, StepOutput) {
    let z = input.z.filter(|z| z.is_finite());
    let dev = input.deviation.filter(|d| d.is_finite());

    let (Some(z), Some(dev)) = (z, dev) else {
        let next = SimState {
            prev_deviation: dev.unwrap_or(state.prev_deviation),
            ..*state
        };
        let out = StepOutput {
            pnl: 0.0,
            equity: state.equity,
            transition: None,
            blocked_entry: false,
        };
        return (next, out);
    };

    let cost = config.transition_cost();
    let mut pnl = 0.0;
    let mut blocked_entry = false;

    let (position, transition) = match state.position {
        Position::Flat => match entry_side(z, config) {
            Some(_) if input.blocked => {
                blocked_entry = true;
                (Position::Flat, None)
            }
            Some(side) => {
                pnl -= cost;
                let entry_z = config.stop_threshold.map(|_| z);
                (Position::open(side, entry_z), Some(Transition::Enter(side)))
            }
            None => (Position::Flat, None),
        },
        Position::Open(open) => {
            let hold = open.hold + 1;
            match exit_reason(&open, hold, z, config) {
                Some(reason) => {
                    pnl -= cost;
                    (
                        Position::Flat,
                        Some(Transition::Exit {
                            side: open.side,
                            reason,
                        }),
                    )
                }
                None => (Position::Open(OpenPosition { hold, ..open }), None),
            }
        }
    };

    if let Some(side) = position.side() {
        pnl += side.sign() * (state.prev_deviation.abs() - dev.abs()) * config.pnl_scale;
    }

    let equity = state.equity * (1.0 + pnl);
    let next = SimState {
        position,
        prev_deviation: dev,
        equity,
    };
    let out = StepOutput {
        pnl,
        equity,
        transition,
        blocked_entry,
    };
    (next, out)
}

fn entry_side(z: f64, config: &SimulatorConfig) -> Option<Side> {
    if z >= config.entry_threshold {
        Some(Side::Long)
    } else if z <= -config.entry_threshold {
        Some(Side::Short)
    } else {
        None
    }
}

fn exit_reason(
    open: &OpenPosition,
    hold: usize,
    z: f64,
    config: &SimulatorConfig,
) -> Option<ExitReason> {
    if let (Some(stop), Some(entry_z)) = (config.stop_threshold, open.entry_z) {
        let adverse = match open.side {
            Side::Long => z > entry_z + stop,
            Side::Short => z < entry_z - stop,
        };
        if adverse {
            return Some(ExitReason::StopLoss);
        }
    }
    if z.abs() <= config.exit_threshold {
        Some(ExitReason::MeanReversion)
    } else if hold >= config.max_hold_days {
        Some(ExitReason::TimeStop)
    } else {
        None
    }
}

/// Run the state machine over a full signal series.
///
/// `z` and `deviation` must have the same length; `blocked`, when given,
/// must match too. Step 0 is the anchor: flat, pnl 0, equity 1.0.
pub fn simulate(
    z: &[Option<f64>],
    deviation: &[Option<f64>],
    blocked: Option<&[bool]>,
    config: &SimulatorConfig,
) -> Result<SimulationResult, SimulatorError> {
    config.validate()?;

    let n = z.len();
    if deviation.len() != n {
        return Err(SimulatorError::LengthMismatch {
            series: "deviation",
            expected: n,
            actual: deviation.len(),
        });
    }
    if let Some(mask) = blocked {
        if mask.len() != n {
            return Err(SimulatorError::LengthMismatch {
                series: "blocked",
                expected: n,
                actual: mask.len(),
            });
        }
    }

    let mut result = SimulationResult {
        pnl: Vec::with_capacity(n),
        equity: Vec::with_capacity(n),
        positions: Vec::with_capacity(n),
        transitions: Vec::new(),
        blocked_entries: 0,
    };

    let Some(&first_dev) = deviation.first() else {
        return Ok(result);
    };

    let anchor = SimState::anchor(first_dev);
    result.pnl.push(0.0);
    result.equity.push(anchor.equity);
    result.positions.push(anchor.position);

    (1..n).fold(anchor, |state, t| {
        let input = StepInput {
            z: z[t],
            deviation: deviation[t],
            blocked: blocked.is_some_and(|mask| mask[t]),
        };
        let (next, out) = step(&state, input, config);

        if let Some(transition) = out.transition {
            trace!(step = t, ?transition, z = ?z[t], "position transition");
            result.transitions.push(TransitionRecord { step: t, transition });
        }
        if out.blocked_entry {
            trace!(step = t, "entry blocked by event calendar");
            result.blocked_entries += 1;
        }

        result.pnl.push(out.pnl);
        result.equity.push(out.equity);
        result.positions.push(next.position);
        next
    });

    debug!(
        steps = n,
        transitions = result.transitions.len(),
        blocked_entries = result.blocked_entries,
        final_equity = result.final_equity(),
        "simulation complete"
    );
    Ok(result)
}
