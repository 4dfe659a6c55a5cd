//! Backtracking CSP solver.
//!
//! Depth-first search over per-task candidate domains with the classic
//! CSP heuristic stack:
//!
//! - **Variable ordering**: minimum remaining values, ties broken by
//!   highest conflict-graph degree, then lexicographic task ID.
//! - **Value ordering**: least-constraining value — candidates sorted by
//!   how many neighbor-domain values they would eliminate, ascending,
//!   ties by earlier start.
//! - **Forward checking**: one level deep. Assigning a task filters the
//!   live domains of its unassigned resource-sharing neighbors; a wiped
//!   domain rejects the branch before recursing.
//!
//! The search is feasibility-first but keeps going after the first
//! complete schedule, pruning branches whose accumulated task penalties
//! already reach the best score. Task penalties are non-negative, so the
//! partial sum is an admissible bound.

use std::time::Duration;

use log::debug;

use super::{Solved, TimeBudget};
use crate::constraints::ConstraintRegistry;
use crate::domain::{Candidate, ConflictGraph, DomainGenerator};
use crate::error::{SolveError, SolveResult};
use crate::models::{Assignment, Resource, Schedule, Task};

/// Backtracking search over candidate domains.
pub struct BacktrackingSolver<'a> {
    registry: &'a ConstraintRegistry,
    quantum: i64,
    time_limit: Duration,
}

impl<'a> BacktrackingSolver<'a> {
    /// Creates a solver scoring with `registry`, quantum 15, budget 30 s.
    pub fn new(registry: &'a ConstraintRegistry) -> Self {
        Self {
            registry,
            quantum: 15,
            time_limit: Duration::from_secs(30),
        }
    }

    /// Sets the domain-generation quantum (minutes).
    pub fn with_quantum(mut self, quantum: i64) -> Self {
        self.quantum = quantum;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Solves the problem to the best schedule the budget allows.
    ///
    /// Returns `Infeasible` when a domain is empty or the search exhausts
    /// without a complete schedule, and `Timeout` wrapping the best-so-far
    /// schedule when the budget expires after one was found.
    pub fn solve(&self, tasks: &[Task], resources: &[Resource]) -> SolveResult<Solved> {
        if tasks.is_empty() {
            return Ok(Solved {
                schedule: Schedule::new(),
                score: 0.0,
                timed_out: false,
            });
        }

        let graph = ConflictGraph::build(tasks);
        let domains = DomainGenerator::new(self.quantum).generate(tasks, resources)?;
        debug!(
            "backtracking over {} tasks, domain sizes {:?}",
            tasks.len(),
            domains.iter().map(Vec::len).collect::<Vec<_>>()
        );

        let mut search = Search {
            tasks,
            graph: &graph,
            registry: self.registry,
            budget: TimeBudget::starting_now(self.time_limit),
            live: domains,
            assigned: vec![None; tasks.len()],
            partial_penalty: 0.0,
            best: None,
            timed_out: false,
        };
        search.dfs(tasks.len());

        match (search.best, search.timed_out) {
            (Some((schedule, score)), false) => Ok(Solved {
                schedule,
                score,
                timed_out: false,
            }),
            (Some((schedule, _)), true) => Err(SolveError::Timeout {
                partial: Some(schedule),
            }),
            (None, true) => Err(SolveError::infeasible("search timed out before any feasible schedule")),
            (None, false) => Err(SolveError::infeasible("search space exhausted")),
        }
    }
}

struct Search<'p> {
    tasks: &'p [Task],
    graph: &'p ConflictGraph,
    registry: &'p ConstraintRegistry,
    budget: TimeBudget,
    live: Vec<Vec<Candidate>>,
    assigned: Vec<Option<Assignment>>,
    partial_penalty: f64,
    best: Option<(Schedule, f64)>,
    timed_out: bool,
}

impl Search<'_> {
    fn dfs(&mut self, remaining: usize) {
        if self.budget.expired() {
            self.timed_out = true;
            return;
        }

        if remaining == 0 {
            self.record_leaf();
            return;
        }

        let var = match self.select_variable() {
            Some(var) => var,
            None => return,
        };

        for candidate in self.ordered_values(var) {
            if self.timed_out {
                return;
            }

            let assignment = candidate.to_assignment(&self.tasks[var]);
            let penalty = self.registry.task_penalty(&self.tasks[var], &assignment);
            if let Some((_, best_score)) = &self.best {
                if self.partial_penalty + penalty >= *best_score {
                    continue;
                }
            }
            let Some(saved) = self.forward_check(var, &assignment) else {
                continue;
            };

            self.assigned[var] = Some(assignment);
            self.partial_penalty += penalty;

            self.dfs(remaining - 1);

            self.partial_penalty -= penalty;
            self.assigned[var] = None;
            for (idx, domain) in saved {
                self.live[idx] = domain;
            }
        }
    }

    fn record_leaf(&mut self) {
        let schedule: Schedule = self
            .assigned
            .iter()
            .flatten()
            .cloned()
            .collect();
        let score = self.partial_penalty + self.registry.schedule_penalty(&schedule);
        let improves = match &self.best {
            Some((_, best_score)) => score < *best_score,
            None => true,
        };
        if improves {
            debug!("new incumbent with score {score}");
            self.best = Some((schedule, score));
        }
    }

    /// MRV, then highest degree, then lexicographic task ID.
    fn select_variable(&self) -> Option<usize> {
        self.assigned
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(i, _)| i)
            .min_by(|&a, &b| {
                self.live[a]
                    .len()
                    .cmp(&self.live[b].len())
                    .then(self.graph.degree(b).cmp(&self.graph.degree(a)))
                    .then(self.tasks[a].id.cmp(&self.tasks[b].id))
            })
    }

    /// Least-constraining value: fewest neighbor eliminations first, ties
    /// by earlier start.
    fn ordered_values(&self, var: usize) -> Vec<Candidate> {
        let duration = self.tasks[var].duration;
        let mut scored: Vec<(usize, Candidate)> = self.live[var]
            .iter()
            .map(|c| (self.eliminated_count(var, c.start, c.start + duration), c.clone()))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.start.cmp(&b.1.start)));
        scored.into_iter().map(|(_, c)| c).collect()
    }

    fn eliminated_count(&self, var: usize, start: i64, end: i64) -> usize {
        self.graph
            .resource_neighbors(var)
            .iter()
            .filter(|&&n| self.assigned[n].is_none())
            .map(|&n| {
                let n_duration = self.tasks[n].duration;
                self.live[n]
                    .iter()
                    .filter(|c| start.max(c.start) < end.min(c.start + n_duration))
                    .count()
            })
            .sum()
    }

    /// Filters the live domains of unassigned resource-sharing neighbors.
    ///
    /// Returns the displaced domains for restoration, or `None` when some
    /// neighbor's domain would be wiped out (the branch is rejected and
    /// state left untouched).
    fn forward_check(
        &mut self,
        var: usize,
        assignment: &Assignment,
    ) -> Option<Vec<(usize, Vec<Candidate>)>> {
        let mut saved = Vec::new();
        for &n in self.graph.resource_neighbors(var) {
            if self.assigned[n].is_some() {
                continue;
            }
            let n_duration = self.tasks[n].duration;
            let filtered: Vec<Candidate> = self.live[n]
                .iter()
                .filter(|c| {
                    assignment.start.max(c.start) >= assignment.end.min(c.start + n_duration)
                })
                .cloned()
                .collect();
            if filtered.is_empty() {
                for (idx, domain) in saved {
                    self.live[idx] = domain;
                }
                return None;
            }
            if filtered.len() != self.live[n].len() {
                saved.push((n, std::mem::replace(&mut self.live[n], filtered)));
            }
        }
        Some(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn registry() -> ConstraintRegistry {
        ConstraintRegistry::builtin()
    }

    #[test]
    fn test_single_task_trivial() {
        // One task, one resource, window exactly matching availability.
        let tasks = vec![Task::new("T1", 60, vec!["R".into()]).with_window(540, 720)];
        let resources = vec![Resource::new("R").with_window(540, 720)];

        let reg = registry();
        let solved = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap();
        let a = solved.schedule.get("T1").unwrap();
        assert_eq!((a.start, a.end), (540, 600));
        assert_eq!(solved.score, 0.0);
        assert!(!solved.timed_out);
    }

    #[test]
    fn test_two_tasks_shared_room() {
        // Both tasks fit their preferred windows back-to-back on R.
        let tasks = vec![
            Task::new("T1", 60, vec!["R".into(), "A".into()])
                .with_window(480, 900)
                .with_preferred(540, 720),
            Task::new("T2", 30, vec!["R".into(), "B".into()])
                .with_window(480, 900)
                .with_preferred(600, 780),
        ];
        let resources = vec![
            Resource::new("R").with_window(480, 1020),
            Resource::new("A").with_window(540, 900),
            Resource::new("B").with_window(600, 960),
        ];

        let reg = registry();
        let solved = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap();
        let t1 = solved.schedule.get("T1").unwrap();
        let t2 = solved.schedule.get("T2").unwrap();
        assert_eq!((t1.start, t1.end), (540, 600));
        assert_eq!((t2.start, t2.end), (600, 630));
        assert_eq!(solved.score, 0.0);
        assert!(solved.schedule.check_invariants(&tasks, &resources).is_ok());
    }

    #[test]
    fn test_no_overlap_on_shared_resource() {
        let tasks = vec![
            Task::new("A", 60, vec!["R".into()]).with_window(0, 200),
            Task::new("B", 60, vec!["R".into()]).with_window(0, 200),
        ];
        let resources = vec![Resource::new("R").with_window(0, 200)];

        let reg = registry();
        let solved = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap();
        let a = solved.schedule.get("A").unwrap();
        let b = solved.schedule.get("B").unwrap();
        assert!(a.end <= b.start || b.end <= a.start);
    }

    #[test]
    fn test_combined_duration_exceeds_window() {
        // Two 60-minute tasks into a 100-minute shared window.
        let tasks = vec![
            Task::new("A", 60, vec!["R".into()]).with_window(0, 100),
            Task::new("B", 60, vec!["R".into()]).with_window(0, 100),
        ];
        let resources = vec![Resource::new("R").with_window(0, 100)];

        let reg = registry();
        let err = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap_err();
        assert!(matches!(err, SolveError::Infeasible { .. }));
    }

    #[test]
    fn test_disjoint_preferred_window_scores_positive() {
        let tasks = vec![Task::new("T1", 30, vec!["R".into()])
            .with_window(0, 120)
            .with_preferred(700, 800)];
        let resources = vec![Resource::new("R").with_window(0, 120)];

        let reg = registry();
        let solved = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap();
        assert!(solved.score > 0.0);
        assert!(solved.schedule.get("T1").unwrap().end <= 120);
    }

    #[test]
    fn test_empty_tasks_empty_schedule() {
        let reg = registry();
        let solved = BacktrackingSolver::new(&reg).solve(&[], &[]).unwrap();
        assert!(solved.schedule.is_empty());
        assert_eq!(solved.score, 0.0);
    }

    #[test]
    fn test_determinism() {
        let tasks = vec![
            Task::new("A", 45, vec!["R".into()]).with_window(0, 400).with_preferred(60, 200),
            Task::new("B", 45, vec!["R".into()]).with_window(0, 400),
            Task::new("C", 30, vec!["R".into(), "S".into()]).with_window(0, 400),
        ];
        let resources = vec![
            Resource::new("R").with_window(0, 400),
            Resource::new("S").with_window(0, 400),
        ];

        let reg = registry();
        let first = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap();
        let second = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap();
        assert_eq!(first.schedule, second.schedule);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn test_zero_budget_times_out() {
        let tasks = vec![
            Task::new("A", 60, vec!["R".into()]),
            Task::new("B", 60, vec!["R".into()]),
        ];
        let resources = vec![Resource::new("R").with_window(0, 1440)];

        let reg = registry();
        let err = BacktrackingSolver::new(&reg)
            .with_time_limit(Duration::ZERO)
            .solve(&tasks, &resources)
            .unwrap_err();
        match err {
            SolveError::Infeasible { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("expected timeout infeasibility, got {other:?}"),
        }
    }

    #[test]
    fn test_independent_tasks_seeded_instance() {
        // 20 tasks on 20 private resources: conflict-free, always solvable.
        let mut rng = SmallRng::seed_from_u64(42);
        let mut tasks = Vec::new();
        let mut resources = Vec::new();
        for i in 0..20 {
            let duration = 15 * rng.random_range(1..=6);
            tasks.push(Task::new(format!("t{i:02}"), duration, vec![format!("r{i:02}")]));
            resources.push(Resource::new(format!("r{i:02}")).with_window(0, 1440));
        }

        let reg = registry();
        let solved = BacktrackingSolver::new(&reg).solve(&tasks, &resources).unwrap();
        assert_eq!(solved.schedule.len(), 20);
        assert!(solved.schedule.check_invariants(&tasks, &resources).is_ok());
    }
}
