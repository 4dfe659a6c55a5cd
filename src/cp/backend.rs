//! In-process CP oracle backend.
//!
//! A small branch-and-bound solver over the model primitives: bounds
//! propagation on linear constraints, smallest-domain-first branching
//! with ascending value order, an incumbent objective cut, and pairwise
//! no-overlap rejection once both intervals are fixed. Deterministic by
//! construction.
//!
//! Built for the model sizes this crate produces; an external CP-SAT
//! binding can replace it behind the same [`CpSolver`] trait.

use std::time::Duration;

use log::debug;

use super::model::{CmpOp, CpModel, CpSolution, CpSolver, CpStatus};
use crate::error::SolveResult;
use crate::solver::TimeBudget;

/// Branch-and-bound solver with bounds-consistency propagation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsCpSolver;

impl BoundsCpSolver {
    /// Creates a backend instance.
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for BoundsCpSolver {
    fn solve(&self, model: &CpModel, time_limit: Duration) -> SolveResult<CpSolution> {
        let mut search = BnbSearch {
            model,
            budget: TimeBudget::starting_now(time_limit),
            incumbent: None,
            timed_out: false,
        };

        let lb: Vec<i64> = model.vars().iter().map(|v| v.lb).collect();
        let ub: Vec<i64> = model.vars().iter().map(|v| v.ub).collect();
        search.branch(lb, ub);

        let status = match (&search.incumbent, search.timed_out) {
            (Some(_), false) => CpStatus::Optimal,
            (Some(_), true) => CpStatus::Feasible,
            (None, false) => CpStatus::Infeasible,
            (None, true) => CpStatus::Unknown,
        };
        debug!("cp backend '{}' finished with {status:?}", model.name);

        let values = search.incumbent.map(|(v, _)| v).unwrap_or_default();
        Ok(CpSolution { status, values })
    }
}

struct BnbSearch<'m> {
    model: &'m CpModel,
    budget: TimeBudget,
    /// Best full assignment and its objective value so far.
    incumbent: Option<(Vec<i64>, i64)>,
    timed_out: bool,
}

impl BnbSearch<'_> {
    fn branch(&mut self, mut lb: Vec<i64>, mut ub: Vec<i64>) {
        if self.budget.expired() {
            self.timed_out = true;
            return;
        }
        if !propagate(self.model, &mut lb, &mut ub) {
            return;
        }
        if let Some((_, best_obj)) = &self.incumbent {
            if objective_lower_bound(self.model, &lb, &ub) >= *best_obj {
                return;
            }
        }

        let Some(var) = pick_variable(&lb, &ub) else {
            // All variables fixed: a candidate assignment.
            self.record(&lb);
            return;
        };

        let (low, high) = (lb[var], ub[var]);
        for value in low..=high {
            if self.timed_out {
                return;
            }
            let mut next_lb = lb.clone();
            let mut next_ub = ub.clone();
            next_lb[var] = value;
            next_ub[var] = value;
            self.branch(next_lb, next_ub);
        }
    }

    fn record(&mut self, values: &[i64]) {
        if !check_no_overlaps(self.model, values) {
            return;
        }
        let objective = self
            .model
            .objective()
            .map(|o| o.terms.iter().map(|&(c, v)| c * values[v]).sum())
            .unwrap_or(0);
        let improves = match &self.incumbent {
            Some((_, best)) => objective < *best,
            None => true,
        };
        if improves {
            self.incumbent = Some((values.to_vec(), objective));
        }
    }
}

/// Smallest unfixed domain; ties by lowest variable index.
fn pick_variable(lb: &[i64], ub: &[i64]) -> Option<usize> {
    (0..lb.len())
        .filter(|&v| lb[v] < ub[v])
        .min_by_key(|&v| ub[v] - lb[v])
}

/// Bounds-consistency fixpoint over the linear constraints, plus
/// fixed-pair no-overlap rejection. Returns false on wipeout.
fn propagate(model: &CpModel, lb: &mut [i64], ub: &mut [i64]) -> bool {
    loop {
        let mut changed = false;
        for c in model.constraints() {
            match c.op {
                CmpOp::Le => {
                    if !tighten_le(&c.terms, c.rhs, lb, ub, &mut changed) {
                        return false;
                    }
                }
                CmpOp::Ge => {
                    let negated: Vec<(i64, usize)> =
                        c.terms.iter().map(|&(coef, v)| (-coef, v)).collect();
                    if !tighten_le(&negated, -c.rhs, lb, ub, &mut changed) {
                        return false;
                    }
                }
                CmpOp::Eq => {
                    if !tighten_le(&c.terms, c.rhs, lb, ub, &mut changed) {
                        return false;
                    }
                    let negated: Vec<(i64, usize)> =
                        c.terms.iter().map(|&(coef, v)| (-coef, v)).collect();
                    if !tighten_le(&negated, -c.rhs, lb, ub, &mut changed) {
                        return false;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    fixed_intervals_disjoint(model, lb, ub)
}

/// Propagates Σ terms ≤ rhs by shrinking each variable's bound against
/// the minimum contribution of the others.
fn tighten_le(
    terms: &[(i64, usize)],
    rhs: i64,
    lb: &mut [i64],
    ub: &mut [i64],
    changed: &mut bool,
) -> bool {
    let min_sum: i64 = terms
        .iter()
        .map(|&(c, v)| if c > 0 { c * lb[v] } else { c * ub[v] })
        .sum();
    if min_sum > rhs {
        return false;
    }
    for &(c, v) in terms {
        let own_min = if c > 0 { c * lb[v] } else { c * ub[v] };
        let slack = rhs - (min_sum - own_min);
        if c > 0 {
            let limit = slack.div_euclid(c);
            if limit < ub[v] {
                ub[v] = limit;
                *changed = true;
                if lb[v] > ub[v] {
                    return false;
                }
            }
        } else {
            // c·x ≤ slack with c < 0 ⟺ x ≥ ceil(slack / c); div_euclid
            // with a negative divisor rounds up, which is exactly that.
            let limit = slack.div_euclid(c);
            if limit > lb[v] {
                lb[v] = limit;
                *changed = true;
                if lb[v] > ub[v] {
                    return false;
                }
            }
        }
    }
    true
}

/// Rejects states where two fixed, present intervals of one no-overlap
/// group overlap. Partially-fixed pairs are left to deeper branches.
fn fixed_intervals_disjoint(model: &CpModel, lb: &[i64], ub: &[i64]) -> bool {
    let fixed = |v: usize| lb[v] == ub[v];
    let present = |iv: &super::model::IntervalVar| match iv.presence {
        Some(p) => fixed(p) && lb[p] == 1,
        None => true,
    };
    let absent = |iv: &super::model::IntervalVar| match iv.presence {
        Some(p) => fixed(p) && lb[p] == 0,
        None => false,
    };

    for group in model.no_overlaps() {
        for (pos, &i) in group.iter().enumerate() {
            let a = &model.intervals()[i];
            if absent(a) || !fixed(a.start) || !present(a) {
                continue;
            }
            for &j in &group[pos + 1..] {
                let b = &model.intervals()[j];
                if absent(b) || !fixed(b.start) || !present(b) {
                    continue;
                }
                let (sa, sb) = (lb[a.start], lb[b.start]);
                if sa.max(sb) < (sa + a.size).min(sb + b.size) {
                    return false;
                }
            }
        }
    }
    true
}

/// Checks every no-overlap group against a full assignment.
fn check_no_overlaps(model: &CpModel, values: &[i64]) -> bool {
    let present = |iv: &super::model::IntervalVar| iv.presence.map_or(true, |p| values[p] == 1);
    for group in model.no_overlaps() {
        for (pos, &i) in group.iter().enumerate() {
            let a = &model.intervals()[i];
            if !present(a) {
                continue;
            }
            for &j in &group[pos + 1..] {
                let b = &model.intervals()[j];
                if !present(b) {
                    continue;
                }
                let (sa, sb) = (values[a.start], values[b.start]);
                if sa.max(sb) < (sa + a.size).min(sb + b.size) {
                    return false;
                }
            }
        }
    }
    true
}

/// Minimum objective value reachable under the current bounds.
fn objective_lower_bound(model: &CpModel, lb: &[i64], ub: &[i64]) -> i64 {
    model
        .objective()
        .map(|o| {
            o.terms
                .iter()
                .map(|&(c, v)| if c > 0 { c * lb[v] } else { c * ub[v] })
                .sum()
        })
        .unwrap_or(0)
}
