//! Simulator configuration, per-step state, and run result types.

use serde::{Deserialize, Serialize};

use crate::domain::{Position, Side};

use super::simulator::SimulatorError;

/// Trading rules and cost model for one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Enter when |z| reaches this level.
    pub entry_threshold: f64,
    /// Exit when |z| falls to this level.
    pub exit_threshold: f64,
    /// Adverse z move from entry that forces a stop-loss exit.
    #[serde(default)]
    pub stop_threshold: Option<f64>,
    /// Force exit once the position has been held this many steps.
    pub max_hold_days: usize,
    /// Commission per transition, in basis points.
    pub trade_cost_bp: f64,
    /// Slippage per transition, in basis points.
    pub slippage_bp: f64,
    /// Maps deviation shrinkage to return.
    pub pnl_scale: f64,
}

/// Rules of the rolling-window baseline strategy.
pub const BASELINE_SIMULATOR: SimulatorConfig = SimulatorConfig {
    entry_threshold: 2.0,
    exit_threshold: 0.5,
    stop_threshold: None,
    max_hold_days: 10,
    trade_cost_bp: 8.0,
    slippage_bp: 8.0,
    pnl_scale: 0.003,
};

/// Rules of the filter-driven enhanced strategy.
pub const ENHANCED_SIMULATOR: SimulatorConfig = SimulatorConfig {
    entry_threshold: 2.0,
    exit_threshold: 0.5,
    stop_threshold: Some(1.0),
    max_hold_days: 10,
    trade_cost_bp: 8.0,
    slippage_bp: 8.0,
    pnl_scale: 0.0032,
};

impl SimulatorConfig {
    /// Reject malformed thresholds and costs.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        let finite = [
            ("entry_threshold", self.entry_threshold),
            ("exit_threshold", self.exit_threshold),
            ("trade_cost_bp", self.trade_cost_bp),
            ("slippage_bp", self.slippage_bp),
            ("pnl_scale", self.pnl_scale),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(SimulatorError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if self.exit_threshold < 0.0 {
            return Err(SimulatorError::InvalidConfig(format!(
                "exit_threshold must be >= 0, got {}",
                self.exit_threshold
            )));
        }
        if self.entry_threshold <= self.exit_threshold {
            return Err(SimulatorError::InvalidConfig(format!(
                "entry_threshold ({}) must be greater than exit_threshold ({})",
                self.entry_threshold, self.exit_threshold
            )));
        }
        if let Some(stop) = self.stop_threshold {
            if !stop.is_finite() || stop <= 0.0 {
                return Err(SimulatorError::InvalidConfig(format!(
                    "stop_threshold must be a finite value > 0, got {stop}"
                )));
            }
        }
        if self.max_hold_days == 0 {
            return Err(SimulatorError::InvalidConfig(
                "max_hold_days must be >= 1".into(),
            ));
        }
        if self.trade_cost_bp < 0.0 || self.slippage_bp < 0.0 {
            return Err(SimulatorError::InvalidConfig(format!(
                "costs must be >= 0, got trade_cost_bp={} slippage_bp={}",
                self.trade_cost_bp, self.slippage_bp
            )));
        }
        Ok(())
    }

    /// Return charged on every entry and every exit.
    pub fn transition_cost(&self) -> f64 {
        (self.trade_cost_bp + self.slippage_bp) / 10_000.0
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    MeanReversion,
    TimeStop,
    /// Still open on the last step (trade extraction only).
    EndOfData,
}

/// A state machine transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    Enter(Side),
    Exit { side: Side, reason: ExitReason },
}

/// A transition and the step it happened on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub step: usize,
    pub transition: Transition,
}

/// State carried from step t−1 to step t.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimState {
    pub position: Position,
    /// Last defined deviation from equilibrium.
    pub prev_deviation: f64,
    pub equity: f64,
}

impl SimState {
    /// State at step 0: flat, equity 1.0, carrying `dev_0` (0.0 if undefined).
    pub fn anchor(deviation: Option<f64>) -> Self {
        Self {
            position: Position::Flat,
            prev_deviation: deviation.filter(|d| d.is_finite()).unwrap_or(0.0),
            equity: 1.0,
        }
    }
}

/// Inputs to a single simulator step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepInput {
    pub z: Option<f64>,
    pub deviation: Option<f64>,
    /// New entries are blocked today.
    pub blocked: bool,
}

/// Outputs of a single simulator step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    pub pnl: f64,
    pub equity: f64,
    pub transition: Option<Transition>,
    /// An entry signal fired but the day was blocked.
    pub blocked_entry: bool,
}

/// Full simulation output, aligned to the input series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub pnl: Vec<f64>,
    pub equity: Vec<f64>,
    /// Position after each step's transition check.
    pub positions: Vec<Position>,
    pub transitions: Vec<TransitionRecord>,
    /// Entry signals suppressed by the event calendar.
    pub blocked_entries: usize,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.equity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equity.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.equity.last().copied().unwrap_or(1.0)
    }

    /// Number of steps with a cost charge.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(BASELINE_SIMULATOR.validate().is_ok());
        assert!(ENHANCED_SIMULATOR.validate().is_ok());
    }

    #[test]
    fn transition_cost_in_return_units() {
        assert!((BASELINE_SIMULATOR.transition_cost() - 0.0016).abs() < 1e-15);
    }

    #[test]
    fn entry_must_exceed_exit() {
        let cfg = SimulatorConfig {
            entry_threshold: 0.5,
            ..BASELINE_SIMULATOR
        };
        assert!(cfg.validate().is_err());
        let cfg = SimulatorConfig {
            entry_threshold: 0.4,
            ..BASELINE_SIMULATOR
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_stop_hold_and_costs() {
        let bad = [
            SimulatorConfig {
                stop_threshold: Some(0.0),
                ..BASELINE_SIMULATOR
            },
            SimulatorConfig {
                max_hold_days: 0,
                ..BASELINE_SIMULATOR
            },
            SimulatorConfig {
                trade_cost_bp: -1.0,
                ..BASELINE_SIMULATOR
            },
            SimulatorConfig {
                exit_threshold: -0.1,
                ..BASELINE_SIMULATOR
            },
            SimulatorConfig {
                pnl_scale: f64::NAN,
                ..BASELINE_SIMULATOR
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "expected rejection: {cfg:?}");
        }
    }

    #[test]
    fn anchor_defaults_missing_deviation_to_zero() {
        let s = SimState::anchor(None);
        assert_eq!(s.prev_deviation, 0.0);
        assert_eq!(s.equity, 1.0);
        assert!(s.position.is_flat());
    }
}
