//! Tabu local-search re-optimizer.
//!
//! Refines an existing feasible schedule by shifting one task at a time.
//! Each iteration evaluates every feasible time-shift move, adopts the
//! best one that is not tabu (recent moves are forbidden to escape local
//! optima, overridden when a move would beat the global best), and keeps
//! the best schedule ever seen. The result is never worse than the input.
//!
//! The search is fully deterministic: neighbor ties are broken by score,
//! then task ID, then shift delta.

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;

use super::{Solved, TimeBudget};
use crate::constraints::ConstraintRegistry;
use crate::error::{SolveError, SolveResult};
use crate::models::{Assignment, Resource, Schedule, Task};

/// Base time-shift deltas (minutes).
const BASE_DELTAS: [i64; 4] = [-60, -30, 30, 60];
/// Extra deltas enabled when the problem quantum is 15 minutes.
const FINE_DELTAS: [i64; 2] = [-15, 15];

/// A candidate move: shift one task by a signed delta.
type Move = (String, i64);

/// Tabu search over time-shift moves.
pub struct TabuSearch<'a> {
    registry: &'a ConstraintRegistry,
    quantum: i64,
    tenure: usize,
    max_iterations: usize,
    stagnation_limit: usize,
    time_limit: Duration,
}

impl<'a> TabuSearch<'a> {
    /// Creates a re-optimizer with tenure 10 and 100 iterations.
    pub fn new(registry: &'a ConstraintRegistry) -> Self {
        Self {
            registry,
            quantum: 15,
            tenure: 10,
            max_iterations: 100,
            stagnation_limit: 25,
            time_limit: Duration::from_secs(30),
        }
    }

    /// Sets the problem quantum (enables ±15 moves when 15).
    pub fn with_quantum(mut self, quantum: i64) -> Self {
        self.quantum = quantum;
        self
    }

    /// Sets the tabu tenure.
    pub fn with_tenure(mut self, tenure: usize) -> Self {
        self.tenure = tenure;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Re-optimizes a feasible schedule.
    ///
    /// Fails with `InvalidInput` when the input schedule violates any hard
    /// constraint; otherwise returns a schedule whose score is at most the
    /// input score.
    pub fn solve(
        &self,
        tasks: &[Task],
        resources: &[Resource],
        initial: &Schedule,
    ) -> SolveResult<Solved> {
        if initial.len() != tasks.len() {
            return Err(SolveError::invalid(format!(
                "initial schedule covers {} tasks, problem has {}",
                initial.len(),
                tasks.len()
            )));
        }
        initial
            .check_invariants(tasks, resources)
            .map_err(SolveError::invalid)?;

        let deltas = self.deltas();
        let budget = TimeBudget::starting_now(self.time_limit);

        let mut current = initial.clone();
        let mut best = current.clone();
        let mut best_score = self.registry.score(&current, tasks);
        let mut tabu: VecDeque<Move> = VecDeque::new();
        let mut stagnation = 0usize;

        for iteration in 0..self.max_iterations {
            if budget.expired() {
                debug!("tabu budget expired at iteration {iteration}");
                break;
            }

            let Some((neighbor, neighbor_score, mv)) =
                self.best_neighbor(tasks, resources, &current, &deltas, &tabu, best_score)
            else {
                break;
            };

            // Steepest move, adopted even when worsening; the incumbent
            // best is what the caller gets back.
            current = neighbor;
            if neighbor_score < best_score {
                debug!("tabu improved score to {neighbor_score} at iteration {iteration}");
                best = current.clone();
                best_score = neighbor_score;
                stagnation = 0;
            } else {
                stagnation += 1;
            }

            tabu.push_back(mv);
            while tabu.len() > self.tenure {
                tabu.pop_front();
            }

            if stagnation >= self.stagnation_limit {
                break;
            }
        }

        Ok(Solved {
            schedule: best,
            score: best_score,
            timed_out: false,
        })
    }

    fn deltas(&self) -> Vec<i64> {
        let mut deltas: Vec<i64> = BASE_DELTAS.to_vec();
        if self.quantum == 15 {
            deltas.extend(FINE_DELTAS);
        }
        deltas.sort_unstable();
        deltas
    }

    /// Evaluates the full neighborhood and returns the best admissible
    /// move: lowest score, ties by task ID then delta. Tabu moves are
    /// skipped unless they beat the global best (aspiration).
    fn best_neighbor(
        &self,
        tasks: &[Task],
        resources: &[Resource],
        current: &Schedule,
        deltas: &[i64],
        tabu: &VecDeque<Move>,
        best_score: f64,
    ) -> Option<(Schedule, f64, Move)> {
        let mut best: Option<(Schedule, f64, Move)> = None;

        for task in tasks {
            let assignment = current.get(&task.id)?;
            for &delta in deltas {
                let shifted = Assignment::new(
                    &task.id,
                    assignment.start + delta,
                    assignment.end + delta,
                    assignment.resources.clone(),
                );
                if !self.is_feasible_move(task, &shifted, resources, current) {
                    continue;
                }

                let mut neighbor = current.clone();
                neighbor.insert(shifted);
                let score = self.registry.score(&neighbor, tasks);

                let mv = (task.id.clone(), delta);
                let is_tabu = tabu.contains(&mv);
                if is_tabu && score >= best_score {
                    continue;
                }

                let replaces = match &best {
                    Some((_, incumbent, (t, d))) => {
                        score < *incumbent
                            || (score == *incumbent
                                && (task.id.as_str(), delta) < (t.as_str(), *d))
                    }
                    None => true,
                };
                if replaces {
                    best = Some((neighbor, score, mv));
                }
            }
        }

        best
    }

    /// A move is feasible when the shifted interval stays inside the
    /// task's window and every resource's availability, and does not
    /// overlap any other assignment holding a shared resource.
    fn is_feasible_move(
        &self,
        task: &Task,
        shifted: &Assignment,
        resources: &[Resource],
        current: &Schedule,
    ) -> bool {
        if shifted.start < task.earliest_start || shifted.end > task.latest_end {
            return false;
        }
        for r_id in &task.required_resources {
            let covered = resources
                .iter()
                .find(|r| &r.id == r_id)
                .is_some_and(|r| r.covers_span(shifted.start, shifted.end));
            if !covered {
                return false;
            }
        }
        for (other_id, other) in current.iter() {
            if other_id == &task.id {
                continue;
            }
            if shifted.shares_resource(other) && shifted.overlaps(other) {
                return false;
            }
        }
        true
    }
}
