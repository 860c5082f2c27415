//! Observation loading and data resolution for the runner.
//!
//! Two sources:
//! 1. CSV file with `date,value` rows (empty or `NaN` value = gap)
//! 2. `synthetic_spread` → deterministic mean-reverting spread (tagged)
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data are tagged as such in every artifact.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use spreadlab_core::domain::{Observation, ObservationSeries, SeriesError};
use spreadlab_core::rng::RngHierarchy;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: invalid value '{value}'")]
    InvalidValue { line: u64, value: String },

    #[error("line {line}: expected at least {expected} columns")]
    MissingColumn { line: u64, expected: usize },

    #[error("series error: {0}")]
    Series(#[from] SeriesError),

    #[error("no observations found")]
    Empty,
}

/// An observation series plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: ObservationSeries,
    /// BLAKE3 over all dates and values.
    pub dataset_hash: String,
    /// Whether the series was generated by `synthetic_spread`.
    pub is_synthetic: bool,
}

impl LoadedData {
    fn new(series: ObservationSeries, is_synthetic: bool) -> Self {
        let dataset_hash = dataset_hash(&series);
        Self {
            series,
            dataset_hash,
            is_synthetic,
        }
    }
}

/// Load a `date,value` CSV file.
pub fn load_observations(path: &Path) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let series = read_observations(file)?;
    debug!(
        path = %path.display(),
        observations = series.len(),
        gaps = series.gap_count(),
        "loaded observations"
    );
    Ok(LoadedData::new(series, false))
}

/// Parse `date,value` CSV from any reader.
///
/// The first row is a header. The date is the first column and the value the
/// second; extra columns are ignored. An empty value, `NaN` or `NA` is a gap.
pub fn read_observations<R: Read>(reader: R) -> Result<ObservationSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut points = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let (Some(date), Some(value)) = (record.get(0), record.get(1)) else {
            return Err(LoadError::MissingColumn { line, expected: 2 });
        };
        points.push(Observation::new(parse_date(date, line)?, parse_value(value, line)?));
    }

    if points.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(ObservationSeries::new(points)?)
}

/// Load a single-column CSV of event dates (header row first).
pub fn load_event_dates(path: &Path) -> Result<Vec<NaiveDate>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_event_dates(file)
}

/// Parse event dates from any reader. Blank rows are skipped.
pub fn read_event_dates<R: Read>(reader: R) -> Result<Vec<NaiveDate>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut dates = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        match record.get(0) {
            Some(field) if !field.is_empty() => dates.push(parse_date(field, line)?),
            _ => continue,
        }
    }
    Ok(dates)
}

fn parse_date(field: &str, line: u64) -> Result<NaiveDate, LoadError> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d").map_err(|_| LoadError::InvalidDate {
        line,
        value: field.to_string(),
    })
}

fn parse_value(field: &str, line: u64) -> Result<Option<f64>, LoadError> {
    if field.is_empty() || field.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    let value: f64 = field.parse().map_err(|_| LoadError::InvalidValue {
        line,
        value: field.to_string(),
    })?;
    Ok((!value.is_nan()).then_some(value))
}

/// Compute a deterministic BLAKE3 hash over all observations.
///
/// Gaps hash as a distinct marker so `[1.0, gap]` and `[1.0]` differ.
pub fn dataset_hash(series: &ObservationSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    for obs in series.points() {
        hasher.update(obs.date.to_string().as_bytes());
        match obs.value {
            Some(v) => {
                hasher.update(&[1]);
                hasher.update(&v.to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Long-run level the synthetic spread reverts to.
const SYNTHETIC_MEAN: f64 = 0.5;
/// Daily pull toward the (drifting) equilibrium.
const SYNTHETIC_REVERSION: f64 = 0.12;
/// Amplitude of the daily uniform shock.
const SYNTHETIC_SHOCK: f64 = 0.35;
const SYNTHETIC_GAP_PROBABILITY: f64 = 0.02;
const SYNTHETIC_JUMP_PROBABILITY: f64 = 0.01;

/// Generate a synthetic implied-volatility spread for testing/development.
///
/// Ornstein–Uhlenbeck-style dynamics around a slowly drifting equilibrium on
/// business days, with occasional missing values and jumps. Deterministic in
/// `seed`; clearly fake and tagged as synthetic.
pub fn synthetic_spread(seed: u64, start: NaiveDate, days: usize) -> LoadedData {
    warn!(seed, days, "generating synthetic spread, results will be tagged as synthetic");

    let mut rng = RngHierarchy::new(seed).rng_for("synthetic_spread", 0);
    let mut points = Vec::with_capacity(days);
    let mut equilibrium = SYNTHETIC_MEAN;
    let mut level = SYNTHETIC_MEAN;
    let mut current = start;

    while points.len() < days {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        equilibrium += rng.gen_range(-0.01..0.01) + 0.002 * (SYNTHETIC_MEAN - equilibrium);
        level += SYNTHETIC_REVERSION * (equilibrium - level)
            + rng.gen_range(-SYNTHETIC_SHOCK..SYNTHETIC_SHOCK);
        if rng.gen_bool(SYNTHETIC_JUMP_PROBABILITY) {
            level += rng.gen_range(-2.0..2.0);
        }

        let value = (!rng.gen_bool(SYNTHETIC_GAP_PROBABILITY)).then_some(level);
        points.push(Observation::new(current, value));
        current += chrono::Duration::days(1);
    }

    // Dates are strictly increasing and values finite by construction.
    let series = ObservationSeries::new(points).unwrap_or_default();
    LoadedData::new(series, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_values_and_gaps() {
        let csv = "date,value\n2024-01-02,0.5\n2024-01-03,\n2024-01-04,NaN\n2024-01-05,-0.25\n";
        let series = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(
            series.values(),
            vec![Some(0.5), None, None, Some(-0.25)]
        );
        assert_eq!(series.gap_count(), 2);
    }

    #[test]
    fn extra_columns_ignored() {
        let csv = "date,iv_spread,source\n2024-01-02,1.5,vendor\n";
        let series = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(series.values(), vec![Some(1.5)]);
    }

    #[test]
    fn invalid_date_reports_line() {
        let csv = "date,value\n2024-01-02,0.5\n01/03/2024,0.6\n";
        let err = read_observations(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDate { line: 3, .. }), "{err}");
    }

    #[test]
    fn invalid_value_rejected() {
        let csv = "date,value\n2024-01-02,abc\n";
        assert!(matches!(
            read_observations(csv.as_bytes()),
            Err(LoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn infinite_value_rejected() {
        let csv = "date,value\n2024-01-02,inf\n";
        assert!(matches!(
            read_observations(csv.as_bytes()),
            Err(LoadError::Series(SeriesError::NonFiniteValue { .. }))
        ));
    }

    #[test]
    fn unsorted_dates_rejected() {
        let csv = "date,value\n2024-01-03,0.5\n2024-01-02,0.6\n";
        assert!(matches!(
            read_observations(csv.as_bytes()),
            Err(LoadError::Series(SeriesError::UnsortedDates { .. }))
        ));
    }

    #[test]
    fn header_only_is_empty() {
        assert!(matches!(
            read_observations("date,value\n".as_bytes()),
            Err(LoadError::Empty)
        ));
    }

    #[test]
    fn event_dates_skip_blank_rows() {
        let csv = "date\n2024-01-02\n\n2024-02-01\n";
        let dates = read_event_dates(csv.as_bytes()).unwrap();
        assert_eq!(dates.len(), 2);
    }

    #[test]
    fn dataset_hash_distinguishes_gaps() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = ObservationSeries::daily(start, vec![Some(1.0), None]).unwrap();
        let b = ObservationSeries::daily(start, vec![Some(1.0), Some(0.0)]).unwrap();
        assert_ne!(dataset_hash(&a), dataset_hash(&b));
        assert_eq!(dataset_hash(&a), dataset_hash(&a.clone()));
    }

    #[test]
    fn synthetic_is_deterministic_business_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = synthetic_spread(42, start, 300);
        let b = synthetic_spread(42, start, 300);
        let c = synthetic_spread(43, start, 300);

        assert_eq!(a.series.len(), 300);
        assert!(a.is_synthetic);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.dataset_hash, c.dataset_hash);
        assert!(a
            .series
            .dates()
            .iter()
            .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
    }
}
