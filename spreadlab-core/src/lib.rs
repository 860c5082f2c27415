//! SpreadLab Core: signal estimation and trade simulation for a single
//! mean-reverting spread.
//!
//! This crate contains the numerical heart of the backtester:
//! - Domain types (observation series with gaps, positions)
//! - Robust scalar Kalman filter and rolling z-score estimators
//! - Event calendars that block new entries on scheduled days
//! - Deterministic Flat / Long / Short trade simulator
//! - Seeded RNG streams
//!
//! Everything here is pure and synchronous. Orchestration, configuration
//! files and metrics live in `spreadlab-runner`.

pub mod calendar;
pub mod domain;
pub mod engine;
pub mod estimators;
pub mod rng;
