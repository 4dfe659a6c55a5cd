//! Time window model.
//!
//! All times are integer minutes relative to a scheduling epoch (t=0).
//! The consumer defines what t=0 means (e.g., midnight, shift start).
//! Every interval is half-open: includes start, excludes end.

use serde::{Deserialize, Serialize};

/// A time interval [start, end) in minutes.
///
/// Serialized as a `[start, end]` pair, the shape request payloads use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: i64,
    /// Interval end (exclusive).
    pub end: i64,
}

impl From<TimeWindow> for (i64, i64) {
    fn from(w: TimeWindow) -> Self {
        (w.start, w.end)
    }
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Duration of this window (minutes).
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether a timestamp falls within this window.
    #[inline]
    pub fn contains_point(&self, time: i64) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether the span [start, end) lies entirely within this window.
    #[inline]
    pub fn contains_span(&self, start: i64, end: i64) -> bool {
        start >= self.start && end <= self.end
    }

    /// Whether two windows overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Distance in minutes between the span [start, end) and this window.
    ///
    /// Zero when the span overlaps or touches the window from inside;
    /// otherwise the gap separating them.
    pub fn distance_to_span(&self, start: i64, end: i64) -> i64 {
        (self.start - end).max(start - self.end).max(0)
    }
}

impl From<(i64, i64)> for TimeWindow {
    fn from((start, end): (i64, i64)) -> Self {
        Self::new(start, end)
    }
}
