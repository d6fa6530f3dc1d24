//! Datetime-index alignment utilities.
//!
//! A "datetime index" here is an ordered `Vec<DateTime<Utc>>` acting as the
//! time axis of a data source.  These functions compute which timestamps are
//! usable as sequence starts or anchors (t0) given the history/forecast
//! window a training example needs.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

/// Returns true iff every consecutive difference is strictly positive.
///
/// # Panics
///
/// Panics on an empty slice.  An empty time axis is a precondition
/// violation, not a recoverable condition.
pub fn is_monotonically_increasing<T: PartialOrd>(values: &[T]) -> bool {
    assert!(
        !values.is_empty(),
        "is_monotonically_increasing requires a non-empty sequence"
    );
    values.windows(2).all(|w| w[0] < w[1])
}

/// Set intersection of one or more datetime indexes, ascending.
///
/// A single input is returned unchanged.  Disjoint inputs yield an empty
/// index.
///
/// # Panics
///
/// Panics if `indexes` is empty.
pub fn intersection_of_datetime_indexes(
    indexes: &[Vec<DateTime<Utc>>],
) -> Vec<DateTime<Utc>> {
    assert!(
        !indexes.is_empty(),
        "intersection_of_datetime_indexes requires at least one index"
    );

    let mut result = indexes[0].clone();
    for index in &indexes[1..] {
        let set: BTreeSet<&DateTime<Utc>> = index.iter().collect();
        result.retain(|dt| set.contains(dt));
    }
    result.dedup();
    result
}

/// Valid start datetimes for a contiguous window of `total_seq_len` samples.
///
/// The index is split into maximal contiguous runs (a gap larger than
/// `max_gap` starts a new run).  Within each run, every entry except the
/// last `total_seq_len - 1` is a valid start.  Runs shorter than
/// `total_seq_len` contribute nothing.
///
/// # Panics
///
/// Panics if the index is empty or not strictly increasing.
pub fn get_start_datetimes(
    datetimes: &[DateTime<Utc>],
    total_seq_len: usize,
    max_gap: Duration,
) -> Vec<DateTime<Utc>> {
    assert!(
        is_monotonically_increasing(datetimes),
        "get_start_datetimes requires a strictly increasing index"
    );
    assert!(total_seq_len >= 2, "total_seq_len must be at least 2");

    let mut starts = Vec::new();
    let mut run_start = 0;
    for i in 1..=datetimes.len() {
        let run_ends = i == datetimes.len() || datetimes[i] - datetimes[i - 1] > max_gap;
        if run_ends {
            let run_len = i - run_start;
            if run_len >= total_seq_len {
                let n_starts = run_len - (total_seq_len - 1);
                starts.extend_from_slice(&datetimes[run_start..run_start + n_starts]);
            }
            run_start = i;
        }
    }
    starts
}

/// Valid anchor (t0) datetimes.
///
/// An anchor needs `history_dur` of data before it and
/// `total_seq_len - history_steps - 1` samples after it, with no gap
/// between consecutive samples exceeding `max_gap`.  For a single regular
/// index this yields `len - history_steps - forecast_steps` anchors, the
/// first at `datetimes[0] + history_dur`.
pub fn get_t0_datetimes(
    datetimes: &[DateTime<Utc>],
    total_seq_len: usize,
    history_dur: Duration,
    max_gap: Duration,
) -> Vec<DateTime<Utc>> {
    get_start_datetimes(datetimes, total_seq_len, max_gap)
        .into_iter()
        .map(|start| start + history_dur)
        .collect()
}

/// Cyclical datetime encodings, one entry per timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DatetimeFeatures {
    /// sin(2π · hour-of-day / 24), hour including the minute fraction.
    pub hour_of_day_sin: Vec<f64>,
    pub hour_of_day_cos: Vec<f64>,
    /// sin(2π · day-of-year / 365.25).
    pub day_of_year_sin: Vec<f64>,
    pub day_of_year_cos: Vec<f64>,
}

/// Encode hour-of-day and day-of-year as sin/cos pairs.
///
/// The 24h period makes 23:55 and 00:00 nearly identical to the model,
/// which plain hour numbers would not.
pub fn datetime_features_in_example(index: &[DateTime<Utc>]) -> DatetimeFeatures {
    let tau = std::f64::consts::TAU;
    let mut features = DatetimeFeatures {
        hour_of_day_sin: Vec::with_capacity(index.len()),
        hour_of_day_cos: Vec::with_capacity(index.len()),
        day_of_year_sin: Vec::with_capacity(index.len()),
        day_of_year_cos: Vec::with_capacity(index.len()),
    };
    for dt in index {
        let hour = dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3600.0;
        let hour_angle = tau * hour / 24.0;
        features.hour_of_day_sin.push(hour_angle.sin());
        features.hour_of_day_cos.push(hour_angle.cos());

        let day = dt.ordinal() as f64 + hour / 24.0;
        let day_angle = tau * day / 365.25;
        features.day_of_year_sin.push(day_angle.sin());
        features.day_of_year_cos.push(day_angle.cos());
    }
    features
}

/// Build a regular datetime range, inclusive of both endpoints.
///
/// Mostly used by tests and the synthetic store writers, but generally
/// handy wherever a regular time axis is needed.
pub fn date_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
) -> Vec<DateTime<Utc>> {
    assert!(step > Duration::zero(), "date_range requires a positive step");
    let mut range = Vec::new();
    let mut current = start;
    while current <= end {
        range.push(current);
        current += step;
    }
    range
}
