//! Scheduling-problem → CP-model translation.
//!
//! Builds an interval model from tasks and resources, hands it to a
//! [`CpSolver`] oracle, and decodes the answer back into a `Schedule`:
//!
//! - One start variable per task, bounded by its feasible window.
//! - Per required resource, one window-choice boolean per availability
//!   window (exactly one true), linked to the start variable with big-M
//!   range constraints, and one optional interval carrying the boolean
//!   as its presence.
//! - A no-overlap constraint per resource over all intervals claiming it.
//! - A minimization objective assembled from the registered soft
//!   constraints: preferred-window displacement slacks and per-resource
//!   idle-time slacks. Workload balance is invariant under capacity-1
//!   fixed resource sets and contributes nothing to steer.

use std::time::Duration;

use log::debug;

use super::model::{CmpOp, CpModel, CpSolution, CpSolver, CpStatus, LinearExpr, VarId};
use crate::constraints::ConstraintRegistry;
use crate::error::{SolveError, SolveResult};
use crate::models::{Assignment, Resource, Schedule, Task};
use crate::solver::Solved;

/// Fixed-point scale applied to registry weights in objective coefficients.
const WEIGHT_SCALE: f64 = 1000.0;

/// A built model plus the task → start-variable mapping for decoding.
pub struct BuiltModel {
    /// The assembled oracle model.
    pub model: CpModel,
    starts: Vec<VarId>,
}

/// Translates problems into CP models and decodes oracle answers.
pub struct CpModelBuilder<'a> {
    tasks: &'a [Task],
    resources: &'a [Resource],
    registry: &'a ConstraintRegistry,
}

impl<'a> CpModelBuilder<'a> {
    /// Creates a builder for one problem instance.
    pub fn new(tasks: &'a [Task], resources: &'a [Resource], registry: &'a ConstraintRegistry) -> Self {
        Self {
            tasks,
            resources,
            registry,
        }
    }

    /// Builds the interval model.
    pub fn build(&self) -> BuiltModel {
        let horizon = self.horizon();
        // Large enough to deactivate any range or ordering link: spans the
        // whole horizon plus the longest possible duration.
        let big_m = 2 * horizon + 1440;
        let mut model = CpModel::new("scheduling");

        let starts: Vec<VarId> = self
            .tasks
            .iter()
            .map(|t| model.new_var(format!("{}_start", t.id), t.earliest_start, t.latest_start()))
            .collect();

        // Availability: window-choice booleans and optional intervals.
        let mut resource_intervals: Vec<Vec<usize>> = vec![Vec::new(); self.resources.len()];
        for (t_idx, task) in self.tasks.iter().enumerate() {
            for r_id in &task.required_resources {
                let Some(r_idx) = self.resources.iter().position(|r| &r.id == r_id) else {
                    continue;
                };
                let resource = &self.resources[r_idx];
                let mut choices = Vec::new();
                for (w_idx, window) in resource.availability.iter().enumerate() {
                    let b = model.new_bool(format!("{}_{}_w{}", task.id, r_id, w_idx));
                    // b = 1 ⟹ start ≥ window.start
                    model.add_linear(
                        vec![(1, starts[t_idx]), (-big_m, b)],
                        CmpOp::Ge,
                        window.start - big_m,
                    );
                    // b = 1 ⟹ start + duration ≤ window.end
                    model.add_linear(
                        vec![(1, starts[t_idx]), (big_m, b)],
                        CmpOp::Le,
                        window.end - task.duration + big_m,
                    );
                    let interval = model.add_interval(
                        format!("{}_{}_w{}_iv", task.id, r_id, w_idx),
                        starts[t_idx],
                        task.duration,
                        Some(b),
                    );
                    resource_intervals[r_idx].push(interval);
                    choices.push((1, b));
                }
                // Exactly one availability window hosts the task. With no
                // windows at all this is 0 = 1: proven infeasible.
                model.add_linear(choices, CmpOp::Eq, 1);
            }
        }

        for intervals in resource_intervals {
            model.add_no_overlap(intervals);
        }

        let objective = self.build_objective(&mut model, &starts, horizon, big_m);
        if !objective.is_empty() {
            model.minimize(objective);
        }

        debug!(
            "built cp model: {} vars, {} constraints, {} intervals",
            model.var_count(),
            model.constraint_count(),
            model.interval_count()
        );
        BuiltModel { model, starts }
    }

    /// Solves via the oracle and decodes the outcome.
    pub fn solve_with(&self, oracle: &dyn CpSolver, time_limit: Duration) -> SolveResult<Solved> {
        if self.tasks.is_empty() {
            return Ok(Solved {
                schedule: Schedule::new(),
                score: 0.0,
                timed_out: false,
            });
        }

        let built = self.build();
        let solution = oracle.solve(&built.model, time_limit)?;
        match solution.status {
            CpStatus::Optimal | CpStatus::Feasible => {
                let schedule = self.decode(&built, &solution)?;
                let score = self.registry.score(&schedule, self.tasks);
                Ok(Solved {
                    schedule,
                    score,
                    timed_out: solution.status == CpStatus::Feasible,
                })
            }
            CpStatus::Infeasible => Err(SolveError::infeasible("oracle proved the model infeasible")),
            CpStatus::Unknown => Err(SolveError::infeasible(
                "oracle time limit elapsed without a feasible incumbent",
            )),
        }
    }

    /// Decodes oracle values into a schedule.
    fn decode(&self, built: &BuiltModel, solution: &CpSolution) -> SolveResult<Schedule> {
        let mut schedule = Schedule::new();
        for (t_idx, task) in self.tasks.iter().enumerate() {
            let start = solution.value(built.starts[t_idx]).ok_or_else(|| {
                SolveError::Internal(format!("oracle solution missing start of task '{}'", task.id))
            })?;
            schedule.insert(Assignment::new(
                &task.id,
                start,
                start + task.duration,
                task.required_resources.clone(),
            ));
        }
        Ok(schedule)
    }

    fn build_objective(
        &self,
        model: &mut CpModel,
        starts: &[VarId],
        horizon: i64,
        big_m: i64,
    ) -> LinearExpr {
        let mut objective = LinearExpr::default();

        let weight_of = |entries: &[(&'static str, f64)], name: &str| {
            entries
                .iter()
                .find(|(n, _)| *n == name)
                .map(|&(_, w)| w)
                .filter(|w| *w > 0.0)
        };

        if let Some(weight) = weight_of(&self.registry.task_weights(), "preferred-time-window") {
            for (t_idx, task) in self.tasks.iter().enumerate() {
                if task.preferred_windows.is_empty() {
                    continue;
                }
                let displacement = model.new_var(format!("{}_disp", task.id), 0, horizon);
                let mut nearest = Vec::new();
                for (w_idx, window) in task.preferred_windows.iter().enumerate() {
                    let p = model.new_bool(format!("{}_pref{}", task.id, w_idx));
                    // p = 1 ⟹ displacement ≥ window.start − (start + duration)
                    model.add_linear(
                        vec![(1, displacement), (1, starts[t_idx]), (-big_m, p)],
                        CmpOp::Ge,
                        window.start - task.duration - big_m,
                    );
                    // p = 1 ⟹ displacement ≥ start − window.end
                    model.add_linear(
                        vec![(1, displacement), (-1, starts[t_idx]), (-big_m, p)],
                        CmpOp::Ge,
                        -window.end - big_m,
                    );
                    nearest.push((1, p));
                }
                // The oracle picks which window bounds the displacement;
                // minimization drives it to the nearest one.
                model.add_linear(nearest, CmpOp::Eq, 1);

                let priority_weight = task.priority.max(1) as f64;
                let coefficient = (weight * priority_weight * WEIGHT_SCALE).round() as i64;
                objective.add_term(coefficient, displacement);
            }
        }

        if let Some(weight) = weight_of(&self.registry.schedule_weights(), "minimize-gaps") {
            let coefficient = (weight * WEIGHT_SCALE).round() as i64;
            for resource in self.resources {
                let claimants: Vec<usize> = self
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.required_resources.iter().any(|r| r == &resource.id))
                    .map(|(i, _)| i)
                    .collect();
                if claimants.len() > 1 {
                    self.add_resource_gap(
                        model,
                        &mut objective,
                        starts,
                        &claimants,
                        coefficient,
                        &resource.id,
                        horizon,
                    );
                }
            }
        }

        objective
    }

    /// Idle-time slack for one resource with two or more claimants.
    ///
    /// With capacity one and no overlap, the idle minutes between
    /// consecutive assignments on a resource equal the occupied span
    /// minus the total claimed duration. Bracketing the span with two
    /// auxiliary variables makes the objective term equal the scorer's
    /// gap penalty exactly, with no ordering booleans.
    #[allow(clippy::too_many_arguments)]
    fn add_resource_gap(
        &self,
        model: &mut CpModel,
        objective: &mut LinearExpr,
        starts: &[VarId],
        claimants: &[usize],
        coefficient: i64,
        resource_id: &str,
        horizon: i64,
    ) {
        let span_start = model.new_var(format!("{resource_id}_span_start"), 0, horizon);
        let span_end = model.new_var(format!("{resource_id}_span_end"), 0, horizon);
        let mut total_duration = 0;
        for &t in claimants {
            let task = &self.tasks[t];
            // span_start ≤ start_t ∧ span_end ≥ start_t + duration
            model.add_linear(vec![(1, starts[t]), (-1, span_start)], CmpOp::Ge, 0);
            model.add_linear(vec![(1, span_end), (-1, starts[t])], CmpOp::Ge, task.duration);
            total_duration += task.duration;
        }

        let gap = model.new_var(format!("{resource_id}_gap"), 0, horizon);
        // gap ≥ span − total duration; minimization drives both span
        // bounds tight, so the slack settles to the true idle time.
        model.add_linear(
            vec![(1, gap), (-1, span_end), (1, span_start)],
            CmpOp::Ge,
            -total_duration,
        );
        objective.add_term(coefficient, gap);
    }

    fn horizon(&self) -> i64 {
        let resource_end = self
            .resources
            .iter()
            .flat_map(|r| r.availability.iter().map(|w| w.end))
            .max()
            .unwrap_or(0);
        let task_end = self.tasks.iter().map(|t| t.latest_end).max().unwrap_or(0);
        resource_end.max(task_end).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::MinimizeGaps;
    use crate::cp::BoundsCpSolver;

    const LIMIT: Duration = Duration::from_secs(10);

    fn shared_room_problem() -> (Vec<Task>, Vec<Resource>) {
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
        (tasks, resources)
    }

    #[test]
    fn test_model_shape() {
        let (tasks, resources) = shared_room_problem();
        let registry = ConstraintRegistry::builtin();
        let built = CpModelBuilder::new(&tasks, &resources, &registry).build();

        // Two starts, four window booleans, two displacement vars, two
        // preferred-window booleans.
        assert_eq!(built.model.var_count(), 10);
        // One interval per (task, resource, window): T1×(R,A) + T2×(R,B).
        assert_eq!(built.model.interval_count(), 4);
        // Only R hosts two intervals.
        assert_eq!(built.model.no_overlaps().len(), 1);
        assert!(built.model.objective().is_some());
    }

    #[test]
    fn test_solve_single_task() {
        let tasks = vec![Task::new("T1", 60, vec!["R".into()]).with_window(540, 720)];
        let resources = vec![Resource::new("R").with_window(540, 720)];
        let registry = ConstraintRegistry::builtin();

        let solved = CpModelBuilder::new(&tasks, &resources, &registry)
            .solve_with(&BoundsCpSolver::new(), LIMIT)
            .unwrap();
        let a = solved.schedule.get("T1").unwrap();
        assert_eq!((a.start, a.end), (540, 600));
        assert_eq!(solved.score, 0.0);
    }

    #[test]
    fn test_solve_shared_room() {
        let (tasks, resources) = shared_room_problem();
        let registry = ConstraintRegistry::builtin();

        let solved = CpModelBuilder::new(&tasks, &resources, &registry)
            .solve_with(&BoundsCpSolver::new(), LIMIT)
            .unwrap();
        assert_eq!(solved.score, 0.0);
        assert!(solved.schedule.check_invariants(&tasks, &resources).is_ok());
    }

    #[test]
    fn test_infeasible_when_window_uncovered() {
        let tasks = vec![Task::new("T1", 30, vec!["R".into()]).with_window(200, 250)];
        let resources = vec![Resource::new("R").with_window(0, 100)];
        let registry = ConstraintRegistry::builtin();

        let err = CpModelBuilder::new(&tasks, &resources, &registry)
            .solve_with(&BoundsCpSolver::new(), LIMIT)
            .unwrap_err();
        assert!(matches!(err, SolveError::Infeasible { .. }));
    }

    #[test]
    fn test_gap_slacks_emitted_when_registered() {
        let (tasks, resources) = shared_room_problem();
        let registry = ConstraintRegistry::builtin().with_schedule_constraint(MinimizeGaps, 1.0);

        let plain = CpModelBuilder::new(&tasks, &resources, &ConstraintRegistry::builtin()).build();
        let with_gaps = CpModelBuilder::new(&tasks, &resources, &registry).build();
        // Only R has two claimants: span-start, span-end, and gap vars.
        // A and B host a single task each and contribute nothing.
        assert_eq!(with_gaps.model.var_count(), plain.model.var_count() + 3);
    }

    #[test]
    fn test_gap_objective_matches_scorer_with_three_claimants() {
        // B and C are pinned by exact-fit windows 110 minutes apart; A
        // can sit in the hole between them or to the right of C. Any
        // in-hole placement leaves 80 idle minutes on R, while parking A
        // after C leaves at least 110, so the oracle must put A inside.
        let tasks = vec![
            Task::new("A", 30, vec!["R".into()]).with_window(260, 430),
            Task::new("B", 30, vec!["R".into()]).with_window(200, 230),
            Task::new("C", 30, vec!["R".into()]).with_window(340, 370),
        ];
        let resources = vec![Resource::new("R").with_window(0, 500)];
        let registry = ConstraintRegistry::new().with_schedule_constraint(MinimizeGaps, 1.0);

        let solved = CpModelBuilder::new(&tasks, &resources, &registry)
            .solve_with(&BoundsCpSolver::new(), LIMIT)
            .unwrap();

        // The reported score is the scorer's consecutive-gap penalty of
        // the decoded schedule, and the objective optimum agrees with it.
        assert_eq!(solved.score, 80.0);
        assert_eq!(solved.score, registry.score(&solved.schedule, &tasks));
        let a = solved.schedule.get("A").unwrap();
        assert!(a.start >= 230 && a.end <= 340);
        assert!(solved.schedule.check_invariants(&tasks, &resources).is_ok());
    }

    #[test]
    fn test_empty_tasks() {
        let registry = ConstraintRegistry::builtin();
        let solved = CpModelBuilder::new(&[], &[], &registry)
            .solve_with(&BoundsCpSolver::new(), LIMIT)
            .unwrap();
        assert!(solved.schedule.is_empty());
        assert_eq!(solved.score, 0.0);
    }
}
