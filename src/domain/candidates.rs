//! Candidate domain generation.
//!
//! For each task, enumerates the feasible `(start, resources)` pairs the
//! solvers search over. Start points are laid on a quantum grid anchored at
//! each availability window, so a window that exactly fits the duration
//! still yields its single candidate.

use std::collections::{BTreeSet, HashMap};

use crate::error::{SolveError, SolveResult};
use crate::models::{Assignment, Resource, Task};

/// One legal placement option for a task.
///
/// `resources` is always the task's full required set; candidates live only
/// for the duration of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Proposed start time (minutes).
    pub start: i64,
    /// Resources the task would hold.
    pub resources: Vec<String>,
}

impl Candidate {
    /// Materializes the candidate as an assignment of `task`.
    pub fn to_assignment(&self, task: &Task) -> Assignment {
        Assignment::new(
            &task.id,
            self.start,
            self.start + task.duration,
            self.resources.clone(),
        )
    }
}

/// Enumerates feasible candidates per task on a quantum grid.
#[derive(Debug, Clone)]
pub struct DomainGenerator {
    quantum: i64,
}

impl DomainGenerator {
    /// Creates a generator with the given grid step (minutes).
    pub fn new(quantum: i64) -> Self {
        Self {
            quantum: quantum.max(1),
        }
    }

    /// Generates the candidate domain of every task, in input order.
    ///
    /// A start `t` is retained iff `[t, t + duration)` lies within the
    /// task's feasible window and inside a single availability window of
    /// every required resource. Candidates are returned sorted ascending
    /// by start time.
    ///
    /// Fails with `Infeasible` naming the first task whose domain is empty.
    pub fn generate(
        &self,
        tasks: &[Task],
        resources: &[Resource],
    ) -> SolveResult<Vec<Vec<Candidate>>> {
        let resource_map: HashMap<&str, &Resource> =
            resources.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut domains = Vec::with_capacity(tasks.len());
        for task in tasks {
            let domain = self.candidates_for(task, &resource_map)?;
            if domain.is_empty() {
                return Err(SolveError::infeasible_task(
                    "no feasible start time",
                    &task.id,
                ));
            }
            domains.push(domain);
        }
        Ok(domains)
    }

    fn candidates_for(
        &self,
        task: &Task,
        resources: &HashMap<&str, &Resource>,
    ) -> SolveResult<Vec<Candidate>> {
        let mut starts: BTreeSet<i64> = BTreeSet::new();

        for r_id in &task.required_resources {
            let resource = resources.get(r_id.as_str()).ok_or_else(|| {
                SolveError::Internal(format!(
                    "unvalidated resource reference '{r_id}' reached domain generation"
                ))
            })?;
            for window in &resource.availability {
                let mut t = window.start.max(task.earliest_start);
                while t + task.duration <= window.end {
                    if t + task.duration > task.latest_end {
                        break;
                    }
                    starts.insert(t);
                    t += self.quantum;
                }
            }
        }

        let feasible = starts
            .into_iter()
            .filter(|&t| {
                task.required_resources.iter().all(|r_id| {
                    resources
                        .get(r_id.as_str())
                        .is_some_and(|r| r.covers_span(t, t + task.duration))
                })
            })
            .map(|start| Candidate {
                start,
                resources: task.required_resources.clone(),
            })
            .collect();

        Ok(feasible)
    }
}
