//! Domain types for SpreadLab

pub mod observation;
pub mod position;

pub use observation::{Observation, ObservationSeries, SeriesError};
pub use position::{OpenPosition, Position, Side};
