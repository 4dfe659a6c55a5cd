//! Resource model.
//!
//! A resource is anything a task must hold exclusively while it runs: a
//! room, a machine, a person. Capacity is fixed at one unit; availability
//! is an ordered sequence of disjoint, non-adjacent time windows.

use serde::{Deserialize, Serialize};

use super::TimeWindow;

/// A capacity-one resource with an availability calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Periods when the resource may be claimed, sorted ascending.
    pub availability: Vec<TimeWindow>,
    /// Number of simultaneous holders. Must be 1.
    #[serde(default = "default_capacity")]
    pub capacity: i32,
}

fn default_capacity() -> i32 {
    1
}

impl Resource {
    /// Creates a resource with no availability.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            availability: Vec::new(),
            capacity: 1,
        }
    }

    /// Adds an availability window.
    pub fn with_window(mut self, start: i64, end: i64) -> Self {
        self.availability.push(TimeWindow::new(start, end));
        self
    }

    /// Whether the span [start, end) lies inside a single availability window.
    pub fn covers_span(&self, start: i64, end: i64) -> bool {
        self.availability.iter().any(|w| w.contains_span(start, end))
    }
}
