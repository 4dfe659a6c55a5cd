//! Solver selection and cache facade.
//!
//! The engine is the solve entry point: it validates the request, consults
//! the fingerprint-keyed cache, picks a solver (or honors an explicit
//! choice), scores the result, and writes it back to the cache. Cache and
//! oracle handles are explicit context values held by the engine — there
//! is no process-wide mutable state beyond the frozen constraint registry.
//!
//! # Selection policy (`auto`)
//! - An initial schedule is provided → tabu local search.
//! - Fewer tasks than the backtracking threshold → backtracking.
//! - Otherwise → the CP oracle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::cache::{InMemoryCache, ScheduleCache};
use crate::config::Settings;
use crate::constraints::ConstraintRegistry;
use crate::cp::{BoundsCpSolver, CpModelBuilder, CpSolver};
use crate::error::{SolveError, SolveResult};
use crate::models::{problem_fingerprint, Resource, Schedule, Task};
use crate::solver::{BacktrackingSolver, Solved, TabuSearch};
use crate::validation::validate_problem;

/// Solver choice carried by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
    /// Let the engine pick.
    #[default]
    Auto,
    /// Backtracking CSP search.
    Backtracking,
    /// CP oracle.
    CpSat,
    /// Tabu re-optimization (requires an initial schedule).
    LocalSearch,
}

/// A solve request as consumed from the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    /// Tasks to place.
    pub tasks: Vec<Task>,
    /// Available resources.
    pub resources: Vec<Resource>,
    /// Requested solver.
    #[serde(default)]
    pub solver: SolverKind,
    /// Warm-start schedule; required for `local-search`.
    #[serde(default)]
    pub initial_schedule: Option<Schedule>,
    /// Wall-clock budget override (per-solver default when omitted).
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
}

impl SolveRequest {
    /// Creates an `auto` request.
    pub fn new(tasks: Vec<Task>, resources: Vec<Resource>) -> Self {
        Self {
            tasks,
            resources,
            solver: SolverKind::Auto,
            initial_schedule: None,
            time_limit_ms: None,
        }
    }

    /// Sets the solver choice.
    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    /// Provides a warm-start schedule.
    pub fn with_initial_schedule(mut self, schedule: Schedule) -> Self {
        self.initial_schedule = Some(schedule);
        self
    }

    /// Overrides the wall-clock budget.
    pub fn with_time_limit_ms(mut self, time_limit_ms: u64) -> Self {
        self.time_limit_ms = Some(time_limit_ms);
        self
    }
}

/// A solve response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolveResponse {
    /// Task ID → assignment.
    pub schedule: Schedule,
    /// Soft-constraint score (lower is better).
    pub score: f64,
    /// Which solver produced the schedule.
    pub solver_used: String,
    /// Whether the response came from the cache.
    pub cached: bool,
    /// Wall-clock time spent serving this request.
    pub elapsed_ms: u64,
}

/// The cache value: the response minus `cached` and `elapsed_ms`.
#[derive(Debug, Serialize, Deserialize)]
struct CachedValue {
    schedule: Schedule,
    score: f64,
    solver_used: String,
}

/// One solver's result in benchmark mode.
#[derive(Debug, Clone)]
pub struct BenchmarkEntry {
    /// Solver label.
    pub solver: String,
    /// Time the solver took.
    pub elapsed_ms: u64,
    /// Score, when the solver produced a schedule.
    pub score: Option<f64>,
    /// The schedule, when one was produced.
    pub schedule: Option<Schedule>,
    /// Failure description otherwise.
    pub error: Option<String>,
}

impl BenchmarkEntry {
    /// Whether the solver produced a feasible schedule.
    pub fn success(&self) -> bool {
        self.schedule.is_some()
    }
}

/// Solve facade holding settings, registry, cache, and oracle handles.
pub struct Engine {
    settings: Settings,
    registry: Arc<ConstraintRegistry>,
    cache: Arc<dyn ScheduleCache>,
    oracle: Arc<dyn CpSolver>,
}

impl Engine {
    /// Creates an engine with default settings, the built-in registry, an
    /// in-memory cache, and the in-process CP backend.
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            registry: Arc::new(ConstraintRegistry::builtin()),
            cache: Arc::new(InMemoryCache::new()),
            oracle: Arc::new(BoundsCpSolver::new()),
        }
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the constraint registry (freezes it into the engine).
    pub fn with_registry(mut self, registry: ConstraintRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Replaces the cache handle.
    pub fn with_cache(mut self, cache: Arc<dyn ScheduleCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the CP oracle handle.
    pub fn with_oracle(mut self, oracle: Arc<dyn CpSolver>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Solves a request end to end.
    ///
    /// Validation failures surface before the cache is touched;
    /// infeasibility and timeout come back as structured errors; cache
    /// failures are logged and never fail the solve.
    pub fn solve(&self, request: &SolveRequest) -> SolveResult<SolveResponse> {
        let started = Instant::now();
        self.validate(request)?;

        let key = problem_fingerprint(
            &request.tasks,
            &request.resources,
            &self.registry.version_tag(),
        );
        if let Some(hit) = self.cache_lookup(&key) {
            info!("cache hit for fingerprint {key}");
            return Ok(SolveResponse {
                schedule: hit.schedule,
                score: hit.score,
                solver_used: "cache".into(),
                cached: true,
                elapsed_ms: elapsed_ms(started),
            });
        }

        let kind = self.select(request);
        debug!("dispatching {} tasks to {kind:?}", request.tasks.len());
        let (label, solved) = self.dispatch(request, kind)?;

        self.cache_store(&key, &label, &solved);
        Ok(SolveResponse {
            schedule: solved.schedule,
            score: solved.score,
            solver_used: label,
            cached: false,
            elapsed_ms: elapsed_ms(started),
        })
    }

    /// Runs every applicable solver on the same problem.
    ///
    /// Backtracking and the CP oracle always run; tabu joins when the
    /// request carries an initial schedule. Nothing is cached.
    pub fn benchmark(&self, request: &SolveRequest) -> SolveResult<Vec<BenchmarkEntry>> {
        self.validate_problem_only(request)?;

        let mut entries = Vec::new();
        entries.push(self.bench_one("backtracking", || {
            self.run_backtracking(request)
        }));
        entries.push(self.bench_one("cp-sat", || self.run_cp(request)));
        if request.initial_schedule.is_some() {
            entries.push(self.bench_one("local-search", || self.run_tabu(request)));
        }
        Ok(entries)
    }

    fn bench_one(
        &self,
        solver: &str,
        run: impl FnOnce() -> SolveResult<(String, Solved)>,
    ) -> BenchmarkEntry {
        let started = Instant::now();
        match run() {
            Ok((label, solved)) => BenchmarkEntry {
                solver: label,
                elapsed_ms: elapsed_ms(started),
                score: Some(solved.score),
                schedule: Some(solved.schedule),
                error: None,
            },
            Err(err) => BenchmarkEntry {
                solver: solver.into(),
                elapsed_ms: elapsed_ms(started),
                score: None,
                schedule: None,
                error: Some(err.to_string()),
            },
        }
    }

    fn validate(&self, request: &SolveRequest) -> SolveResult<()> {
        self.validate_problem_only(request)?;
        if request.solver == SolverKind::LocalSearch && request.initial_schedule.is_none() {
            return Err(SolveError::invalid(
                "solver 'local-search' requires an initial_schedule",
            ));
        }
        Ok(())
    }

    fn validate_problem_only(&self, request: &SolveRequest) -> SolveResult<()> {
        validate_problem(&request.tasks, &request.resources).map_err(SolveError::InvalidInput)
    }

    fn select(&self, request: &SolveRequest) -> SolverKind {
        match request.solver {
            SolverKind::Auto => {
                if request.initial_schedule.is_some() {
                    SolverKind::LocalSearch
                } else if request.tasks.len() < self.settings.selector_backtrack_threshold {
                    SolverKind::Backtracking
                } else {
                    SolverKind::CpSat
                }
            }
            explicit => explicit,
        }
    }

    fn dispatch(
        &self,
        request: &SolveRequest,
        kind: SolverKind,
    ) -> SolveResult<(String, Solved)> {
        match kind {
            SolverKind::Backtracking => self.run_backtracking(request),
            SolverKind::LocalSearch => self.run_tabu(request),
            SolverKind::CpSat => match self.run_cp(request) {
                // Only an explicit cp-sat request surfaces an unavailable
                // oracle; auto-selected requests retry with backtracking.
                Err(SolveError::OracleUnavailable(reason))
                    if request.solver == SolverKind::Auto =>
                {
                    warn!("CP oracle unavailable ({reason}), falling back to backtracking");
                    self.run_backtracking(request)
                }
                other => other,
            },
            SolverKind::Auto => Err(SolveError::Internal(
                "auto must be resolved before dispatch".into(),
            )),
        }
    }

    fn run_backtracking(&self, request: &SolveRequest) -> SolveResult<(String, Solved)> {
        let time_limit = request
            .time_limit_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.settings.backtrack_time_limit());
        let solver = BacktrackingSolver::new(&self.registry)
            .with_quantum(self.settings.quantum_minutes)
            .with_time_limit(time_limit);
        match solver.solve(&request.tasks, &request.resources) {
            Ok(solved) => Ok(("backtracking".into(), solved)),
            // The budget ran out after a feasible schedule was found:
            // return the incumbent.
            Err(SolveError::Timeout {
                partial: Some(schedule),
            }) => {
                let score = self.registry.score(&schedule, &request.tasks);
                Ok((
                    "backtracking".into(),
                    Solved {
                        schedule,
                        score,
                        timed_out: true,
                    },
                ))
            }
            Err(other) => Err(other),
        }
    }

    fn run_cp(&self, request: &SolveRequest) -> SolveResult<(String, Solved)> {
        let time_limit = request
            .time_limit_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.settings.cpsat_time_limit());
        let builder = CpModelBuilder::new(&request.tasks, &request.resources, &self.registry);
        let solved = builder.solve_with(self.oracle.as_ref(), time_limit)?;
        let label = if solved.timed_out {
            "cp-sat (timeout)"
        } else {
            "cp-sat"
        };
        Ok((label.into(), solved))
    }

    fn run_tabu(&self, request: &SolveRequest) -> SolveResult<(String, Solved)> {
        let initial = request.initial_schedule.as_ref().ok_or_else(|| {
            SolveError::invalid("solver 'local-search' requires an initial_schedule")
        })?;
        let mut solver = TabuSearch::new(&self.registry)
            .with_quantum(self.settings.quantum_minutes)
            .with_tenure(self.settings.tabu_tenure)
            .with_max_iterations(self.settings.tabu_max_iter);
        if let Some(ms) = request.time_limit_ms {
            solver = solver.with_time_limit(Duration::from_millis(ms));
        }
        let solved = solver.solve(&request.tasks, &request.resources, initial)?;
        Ok(("local-search".into(), solved))
    }

    fn cache_lookup(&self, key: &str) -> Option<CachedValue> {
        match self.cache.get(key) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("discarding undecodable cache entry {key}: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("cache read failed for {key}: {}", err.0);
                None
            }
        }
    }

    fn cache_store(&self, key: &str, label: &str, solved: &Solved) {
        let value = CachedValue {
            schedule: solved.schedule.clone(),
            score: solved.score,
            solver_used: label.to_string(),
        };
        let bytes = match serde_json::to_vec(&value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("cache encode failed for {key}: {err}");
                return;
            }
        };
        if let Err(err) = self.cache.put(key, bytes, self.settings.cache_ttl()) {
            warn!("cache write failed for {key}: {}", err.0);
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
