//! Built-in soft constraints.
//!
//! # Score Convention
//! Every constraint returns 0.0 when fully satisfied and a positive
//! penalty proportional to the violation otherwise.

use super::{ScheduleConstraint, TaskConstraint};
use crate::models::{Assignment, Schedule, Task};

/// Penalizes assignments displaced from the task's preferred windows.
///
/// Zero when [start, end) is contained in any preferred window (or the
/// task has none); otherwise the minimum minutes separating the assigned
/// interval from the nearest preferred window.
#[derive(Debug, Clone, Copy)]
pub struct PreferredTimeWindow;

impl TaskConstraint for PreferredTimeWindow {
    fn name(&self) -> &'static str {
        "preferred-time-window"
    }

    fn penalty(&self, task: &Task, assignment: &Assignment) -> f64 {
        if task.preferred_windows.is_empty() {
            return 0.0;
        }
        if task
            .preferred_windows
            .iter()
            .any(|w| w.contains_span(assignment.start, assignment.end))
        {
            return 0.0;
        }
        task.preferred_windows
            .iter()
            .map(|w| w.distance_to_span(assignment.start, assignment.end))
            .min()
            .unwrap_or(0) as f64
    }
}

/// Penalizes uneven distribution of assigned minutes across resources.
///
/// Computes the population variance of total assigned minutes per
/// resource, over the resources appearing in the schedule.
#[derive(Debug, Clone, Copy)]
pub struct BalancedWorkload;

impl ScheduleConstraint for BalancedWorkload {
    fn name(&self) -> &'static str {
        "balanced-workload"
    }

    fn penalty(&self, schedule: &Schedule) -> f64 {
        let loads = schedule.minutes_per_resource();
        if loads.is_empty() {
            return 0.0;
        }
        let n = loads.len() as f64;
        let mean = loads.values().map(|&m| m as f64).sum::<f64>() / n;
        loads
            .values()
            .map(|&m| {
                let d = m as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n
    }
}

/// Penalizes idle minutes between consecutive assignments on a resource.
///
/// Encourages compact per-resource timelines.
#[derive(Debug, Clone, Copy)]
pub struct MinimizeGaps;

impl ScheduleConstraint for MinimizeGaps {
    fn name(&self) -> &'static str {
        "minimize-gaps"
    }

    fn penalty(&self, schedule: &Schedule) -> f64 {
        let mut total: i64 = 0;
        for resource_id in schedule.minutes_per_resource().keys() {
            let on_resource = schedule.assignments_for_resource(resource_id);
            for pair in on_resource.windows(2) {
                let gap = pair[1].start - pair[0].end;
                if gap > 0 {
                    total += gap;
                }
            }
        }
        total as f64
    }
}
