//! Schedule (solution) model.
//!
//! A schedule maps every task in a problem to one assignment. Partial
//! schedules are never returned as success; solvers that cannot place all
//! tasks report infeasibility instead.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

use super::{Resource, Task};

/// A task-to-slot assignment.
///
/// `end` is always `start + task.duration`; `resources` is the task's full
/// required set, all held for [start, end).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    /// Assigned task ID.
    pub task_id: String,
    /// Start time (minutes, inclusive).
    pub start: i64,
    /// End time (minutes, exclusive).
    pub end: i64,
    /// Resources held during [start, end).
    pub resources: Vec<String>,
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(task_id: impl Into<String>, start: i64, end: i64, resources: Vec<String>) -> Self {
        Self {
            task_id: task_id.into(),
            start,
            end,
            resources,
        }
    }

    /// Duration (end - start) in minutes.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether two assignments overlap in time.
    #[inline]
    pub fn overlaps(&self, other: &Assignment) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }

    /// Whether two assignments hold at least one resource in common.
    pub fn shares_resource(&self, other: &Assignment) -> bool {
        self.resources
            .iter()
            .any(|r| other.resources.iter().any(|o| o == r))
    }
}

/// A complete schedule: task ID → assignment.
///
/// Backed by a `BTreeMap` so iteration and serialization order are
/// deterministic across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Schedule {
    assignments: BTreeMap<String, Assignment>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an assignment, replacing any previous one for the task.
    pub fn insert(&mut self, assignment: Assignment) {
        self.assignments
            .insert(assignment.task_id.clone(), assignment);
    }

    /// Removes the assignment for a task.
    pub fn remove(&mut self, task_id: &str) -> Option<Assignment> {
        self.assignments.remove(task_id)
    }

    /// Looks up the assignment for a task.
    pub fn get(&self, task_id: &str) -> Option<&Assignment> {
        self.assignments.get(task_id)
    }

    /// Iterates assignments in task-ID order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Assignment> {
        self.assignments.iter()
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the schedule is empty.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// All assignments holding a given resource, sorted by start time.
    pub fn assignments_for_resource(&self, resource_id: &str) -> Vec<&Assignment> {
        let mut found: Vec<&Assignment> = self
            .assignments
            .values()
            .filter(|a| a.resources.iter().any(|r| r == resource_id))
            .collect();
        found.sort_by_key(|a| a.start);
        found
    }

    /// Total minutes assigned per resource.
    pub fn minutes_per_resource(&self) -> BTreeMap<String, i64> {
        let mut load: BTreeMap<String, i64> = BTreeMap::new();
        for a in self.assignments.values() {
            for r in &a.resources {
                *load.entry(r.clone()).or_insert(0) += a.duration();
            }
        }
        load
    }

    /// Makespan: latest end time across all assignments.
    pub fn makespan(&self) -> i64 {
        self.assignments.values().map(|a| a.end).max().unwrap_or(0)
    }

    /// Checks the hard-constraint invariants against the problem inputs.
    ///
    /// Verifies, for every task:
    /// - exactly one assignment exists, with `end - start == duration`;
    /// - the assignment lies within the task's feasible window;
    /// - the span sits inside a single availability window of every
    ///   required resource;
    /// - no two assignments sharing a resource overlap in time.
    ///
    /// Returns the first violation found as a message, or `Ok(())`.
    pub fn check_invariants(&self, tasks: &[Task], resources: &[Resource]) -> Result<(), String> {
        let resource_map: HashMap<&str, &Resource> =
            resources.iter().map(|r| (r.id.as_str(), r)).collect();

        for task in tasks {
            let a = self
                .get(&task.id)
                .ok_or_else(|| format!("task '{}' has no assignment", task.id))?;
            if a.duration() != task.duration {
                return Err(format!(
                    "task '{}' assigned {} minutes, expected {}",
                    task.id,
                    a.duration(),
                    task.duration
                ));
            }
            if a.start < task.earliest_start || a.end > task.latest_end {
                return Err(format!(
                    "task '{}' at [{}, {}) escapes window [{}, {})",
                    task.id, a.start, a.end, task.earliest_start, task.latest_end
                ));
            }
            for r_id in &task.required_resources {
                let resource = resource_map
                    .get(r_id.as_str())
                    .ok_or_else(|| format!("task '{}' references unknown resource '{r_id}'", task.id))?;
                if !resource.covers_span(a.start, a.end) {
                    return Err(format!(
                        "task '{}' at [{}, {}) outside availability of '{r_id}'",
                        task.id, a.start, a.end
                    ));
                }
            }
        }

        let all: Vec<&Assignment> = self.assignments.values().collect();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                if a.shares_resource(b) && a.overlaps(b) {
                    return Err(format!(
                        "assignments '{}' and '{}' overlap on a shared resource",
                        a.task_id, b.task_id
                    ));
                }
            }
        }

        Ok(())
    }
}

impl FromIterator<Assignment> for Schedule {
    fn from_iter<I: IntoIterator<Item = Assignment>>(iter: I) -> Self {
        let mut schedule = Schedule::new();
        for a in iter {
            schedule.insert(a);
        }
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> Schedule {
        Schedule::from_iter([
            Assignment::new("T1", 540, 600, vec!["R".into(), "A".into()]),
            Assignment::new("T2", 600, 630, vec!["R".into(), "B".into()]),
        ])
    }

    #[test]
    fn test_assignment_overlap() {
        let a = Assignment::new("a", 0, 60, vec!["R".into()]);
        let b = Assignment::new("b", 30, 90, vec!["R".into()]);
        let c = Assignment::new("c", 60, 120, vec!["R".into()]);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // half-open: touching is not overlap
    }

    #[test]
    fn test_schedule_queries() {
        let s = sample_schedule();
        assert_eq!(s.len(), 2);
        assert_eq!(s.makespan(), 630);

        let on_r = s.assignments_for_resource("R");
        assert_eq!(on_r.len(), 2);
        assert_eq!(on_r[0].task_id, "T1"); // sorted by start

        let load = s.minutes_per_resource();
        assert_eq!(load["R"], 90);
        assert_eq!(load["A"], 60);
        assert_eq!(load["B"], 30);
    }

    #[test]
    fn test_check_invariants_passes() {
        let tasks = vec![
            Task::new("T1", 60, vec!["R".into(), "A".into()]).with_window(480, 900),
            Task::new("T2", 30, vec!["R".into(), "B".into()]).with_window(480, 900),
        ];
        let resources = vec![
            Resource::new("R").with_window(480, 1020),
            Resource::new("A").with_window(540, 900),
            Resource::new("B").with_window(600, 960),
        ];
        assert!(sample_schedule().check_invariants(&tasks, &resources).is_ok());
    }

    #[test]
    fn test_check_invariants_detects_overlap() {
        let tasks = vec![
            Task::new("T1", 60, vec!["R".into()]),
            Task::new("T2", 60, vec!["R".into()]),
        ];
        let resources = vec![Resource::new("R").with_window(0, 1440)];
        let s = Schedule::from_iter([
            Assignment::new("T1", 0, 60, vec!["R".into()]),
            Assignment::new("T2", 30, 90, vec!["R".into()]),
        ]);
        let err = s.check_invariants(&tasks, &resources).unwrap_err();
        assert!(err.contains("overlap"));
    }

    #[test]
    fn test_check_invariants_detects_missing_task() {
        let tasks = vec![Task::new("T1", 60, vec!["R".into()])];
        let resources = vec![Resource::new("R").with_window(0, 1440)];
        let err = Schedule::new().check_invariants(&tasks, &resources).unwrap_err();
        assert!(err.contains("no assignment"));
    }

    #[test]
    fn test_serde_transparent_map() {
        let s = sample_schedule();
        let json = serde_json::to_string(&s).unwrap();
        // Serializes as a plain task_id → assignment map, in ID order.
        assert!(json.starts_with(r#"{"T1""#));
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
