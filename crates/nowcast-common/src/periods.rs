//! Interval-overlap computation between sets of labelled time ranges.
//!
//! Each data source reports the periods for which it has contiguous valid
//! data.  Before anchors can be picked, those per-source periods have to be
//! intersected so every example falls inside data that all sources can
//! serve.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closed `[start, end]` time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True iff the two closed intervals share at least one instant.
    pub fn overlaps(&self, other: &Period) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The overlapping sub-interval, if any.
    pub fn intersect(&self, other: &Period) -> Option<Period> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Period {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }
}

/// Every overlapping sub-interval between two sets of periods.
///
/// The cross product is scanned in input order (outer `a`, inner `b`), so
/// results follow the chronology of the inputs when the inputs themselves
/// are chronological.  Identical or nested pairs yield the smaller
/// interval; non-overlapping pairs yield nothing.
pub fn intersection_of_periods(a: &[Period], b: &[Period]) -> Vec<Period> {
    let mut intersections = Vec::new();
    for period_a in a {
        for period_b in b {
            if let Some(overlap) = period_a.intersect(period_b) {
                intersections.push(overlap);
            }
        }
    }
    intersections
}
