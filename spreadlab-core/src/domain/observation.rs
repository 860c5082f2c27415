//! Observation series: the dated spread values the estimators consume.
//!
//! A missing value (`None`) is a gap marker, not an error. Gaps are carried
//! through every stage and produce undefined signals at the same index.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building an observation series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("dates must be strictly increasing: {previous} is followed by {next} at index {index}")]
    UnsortedDates {
        index: usize,
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("non-finite observation {value} at index {index} ({date})")]
    NonFiniteValue {
        index: usize,
        date: NaiveDate,
        value: f64,
    },

    #[error("dates and values have different lengths: {dates} dates, {values} values")]
    LengthMismatch { dates: usize, values: usize },
}

/// A single dated observation. `value == None` marks a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }

    pub fn is_gap(&self) -> bool {
        self.value.is_none()
    }
}

/// Ordered, validated sequence of observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    points: Vec<Observation>,
}

impl ObservationSeries {
    /// Validate and wrap a list of observations.
    ///
    /// NaN values are normalized to gaps; infinite values are rejected.
    pub fn new(points: Vec<Observation>) -> Result<Self, SeriesError> {
        let mut normalized = Vec::with_capacity(points.len());
        for (index, mut obs) in points.into_iter().enumerate() {
            if let Some(v) = obs.value {
                if v.is_nan() {
                    obs.value = None;
                } else if v.is_infinite() {
                    return Err(SeriesError::NonFiniteValue {
                        index,
                        date: obs.date,
                        value: v,
                    });
                }
            }
            if let Some(prev) = normalized.last().map(|p: &Observation| p.date) {
                if obs.date <= prev {
                    return Err(SeriesError::UnsortedDates {
                        index,
                        previous: prev,
                        next: obs.date,
                    });
                }
            }
            normalized.push(obs);
        }
        Ok(Self { points: normalized })
    }

    /// Build a series from parallel date and value vectors.
    pub fn from_parts(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Result<Self, SeriesError> {
        if dates.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            });
        }
        Self::new(
            dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| Observation { date, value })
                .collect(),
        )
    }

    /// Build a series on consecutive calendar days starting at `start`.
    ///
    /// Convenient for tests and synthetic data where dates carry no meaning.
    /// Values are validated as in [`ObservationSeries::new`].
    pub fn daily(start: NaiveDate, values: Vec<Option<f64>>) -> Result<Self, SeriesError> {
        Self::new(
            values
                .into_iter()
                .enumerate()
                .map(|(i, value)| Observation {
                    date: start + chrono::Duration::days(i as i64),
                    value,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn gap_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_gap()).count()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn nan_becomes_gap() {
        let series = ObservationSeries::new(vec![
            Observation::new(d(2), Some(1.0)),
            Observation::new(d(3), Some(f64::NAN)),
            Observation::new(d(4), Some(1.2)),
        ])
        .unwrap();
        assert_eq!(series.values(), vec![Some(1.0), None, Some(1.2)]);
        assert_eq!(series.gap_count(), 1);
    }

    #[test]
    fn infinite_value_rejected() {
        let err = ObservationSeries::new(vec![
            Observation::new(d(2), Some(1.0)),
            Observation::new(d(3), Some(f64::INFINITY)),
        ])
        .unwrap_err();
        assert!(matches!(err, SeriesError::NonFiniteValue { index: 1, .. }));
    }

    #[test]
    fn unsorted_dates_rejected() {
        let err = ObservationSeries::new(vec![
            Observation::new(d(3), Some(1.0)),
            Observation::new(d(3), Some(1.1)),
        ])
        .unwrap_err();
        assert!(matches!(err, SeriesError::UnsortedDates { index: 1, .. }));
    }

    #[test]
    fn from_parts_length_mismatch() {
        let err = ObservationSeries::from_parts(vec![d(2)], vec![Some(1.0), Some(2.0)]).unwrap_err();
        assert_eq!(err, SeriesError::LengthMismatch { dates: 1, values: 2 });
    }

    #[test]
    fn daily_builds_consecutive_dates() {
        let series = ObservationSeries::daily(d(2), vec![Some(1.0), None, Some(3.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date(), Some(d(2)));
        assert_eq!(series.last_date(), Some(d(4)));
    }

    #[test]
    fn daily_applies_same_value_rules_as_new() {
        let err = ObservationSeries::daily(d(2), vec![Some(1.0), Some(f64::NEG_INFINITY)]).unwrap_err();
        assert!(matches!(err, SeriesError::NonFiniteValue { index: 1, .. }));

        let series = ObservationSeries::daily(d(2), vec![Some(f64::NAN), Some(1.0)]).unwrap();
        assert_eq!(series.values(), vec![None, Some(1.0)]);
    }
}
