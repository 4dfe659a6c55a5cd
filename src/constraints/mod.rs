//! Soft-constraint registry and scorer.
//!
//! A soft constraint maps an assignment (or a whole schedule) to a
//! non-negative penalty; the score of a schedule is the weighted sum of all
//! registered penalties. Lower is better, and scores are comparable only
//! within one problem instance.
//!
//! Constraints come in two granularities, mirroring how they are evaluated:
//!
//! - [`TaskConstraint`]: scored per assignment, weighted by task priority.
//! - [`ScheduleConstraint`]: scored once over the full schedule.
//!
//! The registry is assembled at process start and frozen thereafter; its
//! version tag is folded into the problem fingerprint so cached schedules
//! are invalidated when the active constraint set changes.

mod builtin;

pub use builtin::{BalancedWorkload, MinimizeGaps, PreferredTimeWindow};

use std::sync::Arc;

use crate::models::{Assignment, Schedule, Task};

/// A penalty evaluated per task assignment.
pub trait TaskConstraint: Send + Sync {
    /// Stable constraint name (part of the registry version tag).
    fn name(&self) -> &'static str;

    /// Non-negative penalty for placing `task` at `assignment`.
    fn penalty(&self, task: &Task, assignment: &Assignment) -> f64;
}

/// A penalty evaluated once over a complete schedule.
pub trait ScheduleConstraint: Send + Sync {
    /// Stable constraint name (part of the registry version tag).
    fn name(&self) -> &'static str;

    /// Non-negative penalty for the schedule as a whole.
    fn penalty(&self, schedule: &Schedule) -> f64;
}

struct WeightedTaskConstraint {
    constraint: Arc<dyn TaskConstraint>,
    weight: f64,
}

struct WeightedScheduleConstraint {
    constraint: Arc<dyn ScheduleConstraint>,
    weight: f64,
}

/// Weighted collection of soft constraints.
///
/// # Example
/// ```
/// use slotplan::constraints::{BalancedWorkload, ConstraintRegistry};
///
/// let registry = ConstraintRegistry::builtin()
///     .with_schedule_constraint(BalancedWorkload, 0.5);
/// assert!(registry.version_tag().contains("balanced-workload"));
/// ```
pub struct ConstraintRegistry {
    task_constraints: Vec<WeightedTaskConstraint>,
    schedule_constraints: Vec<WeightedScheduleConstraint>,
}

impl ConstraintRegistry {
    /// Creates an empty registry (every schedule scores 0).
    pub fn new() -> Self {
        Self {
            task_constraints: Vec::new(),
            schedule_constraints: Vec::new(),
        }
    }

    /// Creates the default registry: preferred-window displacement at
    /// weight 1.0.
    pub fn builtin() -> Self {
        Self::new().with_task_constraint(PreferredTimeWindow, 1.0)
    }

    /// Registers a task-level constraint.
    pub fn with_task_constraint<C: TaskConstraint + 'static>(mut self, constraint: C, weight: f64) -> Self {
        self.task_constraints.push(WeightedTaskConstraint {
            constraint: Arc::new(constraint),
            weight,
        });
        self
    }

    /// Registers a schedule-level constraint.
    pub fn with_schedule_constraint<C: ScheduleConstraint + 'static>(
        mut self,
        constraint: C,
        weight: f64,
    ) -> Self {
        self.schedule_constraints.push(WeightedScheduleConstraint {
            constraint: Arc::new(constraint),
            weight,
        });
        self
    }

    /// Canonical tag identifying the registered constraints and weights.
    ///
    /// Independent of registration order.
    pub fn version_tag(&self) -> String {
        let mut entries: Vec<String> = self
            .task_constraints
            .iter()
            .map(|c| format!("{}={}", c.constraint.name(), c.weight))
            .chain(
                self.schedule_constraints
                    .iter()
                    .map(|c| format!("{}={}", c.constraint.name(), c.weight)),
            )
            .collect();
        entries.sort();
        entries.join(",")
    }

    /// Weighted task-level penalty of one assignment.
    ///
    /// Higher-priority tasks weight their penalties proportionally; the
    /// default priority of 1 is neutral.
    pub fn task_penalty(&self, task: &Task, assignment: &Assignment) -> f64 {
        let priority_weight = task.priority.max(1) as f64;
        self.task_constraints
            .iter()
            .map(|c| c.weight * priority_weight * c.constraint.penalty(task, assignment))
            .sum()
    }

    /// Weighted schedule-level penalty.
    pub fn schedule_penalty(&self, schedule: &Schedule) -> f64 {
        self.schedule_constraints
            .iter()
            .map(|c| c.weight * c.constraint.penalty(schedule))
            .sum()
    }

    /// Full score of a schedule: task-level plus schedule-level penalties.
    pub fn score(&self, schedule: &Schedule, tasks: &[Task]) -> f64 {
        let mut total = self.schedule_penalty(schedule);
        for task in tasks {
            if let Some(assignment) = schedule.get(&task.id) {
                total += self.task_penalty(task, assignment);
            }
        }
        total
    }

    /// Weights registered for each task-level constraint, by name.
    ///
    /// Used by the CP model builder to scale objective terms.
    pub fn task_weights(&self) -> Vec<(&'static str, f64)> {
        self.task_constraints
            .iter()
            .map(|c| (c.constraint.name(), c.weight))
            .collect()
    }

    /// Weights registered for each schedule-level constraint, by name.
    pub fn schedule_weights(&self) -> Vec<(&'static str, f64)> {
        self.schedule_constraints
            .iter()
            .map(|c| (c.constraint.name(), c.weight))
            .collect()
    }
}

impl Default for ConstraintRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Assignment;

    fn sample_schedule() -> Schedule {
        Schedule::from_iter([
            Assignment::new("T1", 540, 600, vec!["R".into(), "A".into()]),
            Assignment::new("T2", 600, 630, vec!["R".into(), "B".into()]),
        ])
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new("T1", 60, vec!["R".into(), "A".into()])
                .with_window(480, 900)
                .with_preferred(540, 720),
            Task::new("T2", 30, vec!["R".into(), "B".into()])
                .with_window(480, 900)
                .with_preferred(600, 780),
        ]
    }

    #[test]
    fn test_default_registry_scores_contained_windows_zero() {
        let registry = ConstraintRegistry::builtin();
        let score = registry.score(&sample_schedule(), &sample_tasks());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_displacement_scored_with_weight() {
        // Same schedule, but T1 prefers [720, 780) instead.
        let mut tasks = sample_tasks();
        tasks[0].preferred_windows = vec![(720, 780).into()];

        let registry = ConstraintRegistry::builtin();
        let score = registry.score(&sample_schedule(), &tasks);
        assert_eq!(score, 120.0);
    }

    #[test]
    fn test_priority_scales_task_penalty() {
        let mut tasks = sample_tasks();
        tasks[0].preferred_windows = vec![(720, 780).into()];
        tasks[0].priority = 3;

        let registry = ConstraintRegistry::builtin();
        assert_eq!(registry.score(&sample_schedule(), &tasks), 360.0);
    }

    #[test]
    fn test_schedule_constraint_registration() {
        let registry = ConstraintRegistry::builtin().with_schedule_constraint(BalancedWorkload, 1.0);
        // Loads: R=90, A=60, B=30 → mean 60, variance (900+0+900)/3.
        let score = registry.score(&sample_schedule(), &sample_tasks());
        assert_eq!(score, 600.0);
    }

    #[test]
    fn test_version_tag_order_independent() {
        let a = ConstraintRegistry::new()
            .with_task_constraint(PreferredTimeWindow, 1.0)
            .with_schedule_constraint(MinimizeGaps, 2.0);
        let b = ConstraintRegistry::new()
            .with_schedule_constraint(MinimizeGaps, 2.0)
            .with_task_constraint(PreferredTimeWindow, 1.0);
        assert_eq!(a.version_tag(), b.version_tag());
        assert_ne!(a.version_tag(), ConstraintRegistry::builtin().version_tag());
    }

    #[test]
    fn test_empty_registry_scores_zero() {
        let registry = ConstraintRegistry::new();
        assert_eq!(registry.score(&sample_schedule(), &sample_tasks()), 0.0);
        assert_eq!(registry.version_tag(), "");
    }
}
