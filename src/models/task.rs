//! Task model.
//!
//! A task is an indivisible unit of work with a fixed duration, a set of
//! resources it must hold simultaneously, a feasible placement window, and
//! optional preferred windows that only affect soft scoring.

use serde::{Deserialize, Serialize};

use super::TimeWindow;

/// Latest-end default when a request omits the field: one day in minutes.
pub const DEFAULT_LATEST_END: i64 = 1440;

/// A task to be scheduled.
///
/// Immutable once built. All required resources must be held for the whole
/// of [start, start + duration).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Processing duration (minutes).
    pub duration: i64,
    /// Resources that must all be held simultaneously.
    pub required_resources: Vec<String>,
    /// Windows the task should ideally fall into (soft scoring only).
    #[serde(default)]
    pub preferred_windows: Vec<TimeWindow>,
    /// Earliest feasible start (minutes).
    #[serde(default)]
    pub earliest_start: i64,
    /// Latest feasible end (minutes).
    #[serde(default = "default_latest_end")]
    pub latest_end: i64,
    /// Scheduling priority; higher priorities weight soft penalties more.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_latest_end() -> i64 {
    DEFAULT_LATEST_END
}

fn default_priority() -> i32 {
    1
}

impl Task {
    /// Creates a task with the given ID and duration, requiring `resources`.
    ///
    /// The feasible window defaults to [0, 1440) and priority to 1.
    pub fn new(id: impl Into<String>, duration: i64, resources: Vec<String>) -> Self {
        Self {
            id: id.into(),
            duration,
            required_resources: resources,
            preferred_windows: Vec::new(),
            earliest_start: 0,
            latest_end: DEFAULT_LATEST_END,
            priority: 1,
        }
    }

    /// Sets the feasible placement window.
    pub fn with_window(mut self, earliest_start: i64, latest_end: i64) -> Self {
        self.earliest_start = earliest_start;
        self.latest_end = latest_end;
        self
    }

    /// Adds a preferred window.
    pub fn with_preferred(mut self, from: i64, to: i64) -> Self {
        self.preferred_windows.push(TimeWindow::new(from, to));
        self
    }

    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// The latest start that still ends by `latest_end`.
    #[inline]
    pub fn latest_start(&self) -> i64 {
        self.latest_end - self.duration
    }

    /// The feasible placement window as a `TimeWindow`.
    #[inline]
    pub fn feasible_window(&self) -> TimeWindow {
        TimeWindow::new(self.earliest_start, self.latest_end)
    }

    /// Whether this task shares at least one required resource with `other`.
    pub fn shares_resource_with(&self, other: &Task) -> bool {
        self.required_resources
            .iter()
            .any(|r| other.required_resources.iter().any(|o| o == r))
    }
}
