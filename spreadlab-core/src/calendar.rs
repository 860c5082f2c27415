//! Event calendars: which days block new entries.
//!
//! The simulator never generates its own blocking days. A calendar is injected
//! and asked for a boolean mask aligned to the series dates; `true` means no
//! new position may be opened that day. Exits are never blocked.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rand::seq::index::sample;
use thiserror::Error;

use crate::rng::RngHierarchy;

/// Seed of the reference placeholder calendar.
pub const DEFAULT_EVENT_SEED: u64 = 17;
/// Fraction of days the placeholder calendar blocks.
pub const DEFAULT_SKIP_RATIO: f64 = 0.03;
/// Steps at each end of the series the placeholder calendar never blocks.
pub const DEFAULT_EVENT_MARGIN: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalendarError {
    #[error("skip_ratio must be within [0, 1], got {0}")]
    InvalidSkipRatio(f64),
}

/// Provider of entry-blocking days.
pub trait EventCalendar: Send + Sync {
    /// Human-readable name (e.g., "none", "event_dates").
    fn name(&self) -> &str;

    /// Boolean mask aligned to `dates`.
    fn blocked_mask(&self, dates: &[NaiveDate]) -> Vec<bool>;
}

/// Calendar with no events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl EventCalendar for NoEvents {
    fn name(&self) -> &str {
        "none"
    }

    fn blocked_mask(&self, dates: &[NaiveDate]) -> Vec<bool> {
        vec![false; dates.len()]
    }
}

/// Calendar backed by an explicit set of event dates (e.g., macro releases).
#[derive(Debug, Clone, Default)]
pub struct EventDates {
    dates: BTreeSet<NaiveDate>,
}

impl EventDates {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

impl EventCalendar for EventDates {
    fn name(&self) -> &str {
        "event_dates"
    }

    fn blocked_mask(&self, dates: &[NaiveDate]) -> Vec<bool> {
        dates.iter().map(|d| self.dates.contains(d)).collect()
    }
}

/// Placeholder calendar that blocks a seeded random subset of days.
///
/// Picks `floor(n · skip_ratio)` distinct steps from `margin..n−margin`
/// (capped at the number of candidates). Only useful for demos and
/// sensitivity checks when no real calendar is available.
#[derive(Debug, Clone)]
pub struct SeededRandomCalendar {
    seed: u64,
    skip_ratio: f64,
    margin: usize,
}

impl SeededRandomCalendar {
    pub fn new(seed: u64, skip_ratio: f64, margin: usize) -> Result<Self, CalendarError> {
        if !(0.0..=1.0).contains(&skip_ratio) {
            return Err(CalendarError::InvalidSkipRatio(skip_ratio));
        }
        Ok(Self {
            seed,
            skip_ratio,
            margin,
        })
    }
}

impl EventCalendar for SeededRandomCalendar {
    fn name(&self) -> &str {
        "seeded_random"
    }

    fn blocked_mask(&self, dates: &[NaiveDate]) -> Vec<bool> {
        let n = dates.len();
        let mut mask = vec![false; n];
        let candidates = n.saturating_sub(2 * self.margin);
        let count = ((n as f64 * self.skip_ratio).floor() as usize).min(candidates);
        if count == 0 {
            return mask;
        }

        let mut rng = RngHierarchy::new(self.seed).rng_for("event_calendar", 0);
        for offset in sample(&mut rng, candidates, count).iter() {
            mask[self.margin + offset] = true;
        }
        mask
    }
}
