//! Trade simulation engine.
//!
//! The engine consumes a precomputed signal (z-score and deviation series)
//! plus an optional entry-blocking mask, and runs the Flat / Long / Short
//! state machine one step at a time:
//!
//! 1. Freeze on undefined inputs
//! 2. Entry check (blocked days suppress entries only)
//! 3. Exit checks: stop-loss, mean reversion, time stop
//! 4. Accrual and equity compounding

pub mod simulator;
pub mod state;
pub mod trade_extraction;

pub use simulator::{simulate, step, SimulatorError};
pub use state::{
    ExitReason, SimState, SimulationResult, SimulatorConfig, StepInput, StepOutput, Transition,
    TransitionRecord, BASELINE_SIMULATOR, ENHANCED_SIMULATOR,
};
pub use trade_extraction::{extract_trades, TradeRecord};
