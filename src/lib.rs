//! Constraint-satisfaction scheduling engine.
//!
//! Given tasks (duration, required resources, feasible window, preferred
//! windows) and capacity-one resources (availability calendars), produces
//! a conflict-free assignment of every task to a start time that satisfies
//! all hard constraints and minimizes the weighted soft-constraint score.
//! Feasible schedules can also be re-optimized incrementally.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Task`, `Resource`, `TimeWindow`,
//!   `Assignment`, `Schedule` — and the canonical problem fingerprint
//! - **`validation`**: Structural input checks run before any solver
//! - **`constraints`**: Pluggable soft-constraint registry and scorer
//! - **`domain`**: Candidate enumeration and the task conflict graph
//! - **`solver`**: Backtracking CSP search and the tabu re-optimizer
//! - **`cp`**: CP model builder and the solver-oracle interface
//! - **`engine`**: Solver selection, fingerprint cache, benchmark mode
//! - **`cache`** / **`config`** / **`error`**: supporting facilities
//!
//! # Example
//!
//! ```
//! use slotplan::engine::{Engine, SolveRequest};
//! use slotplan::models::{Resource, Task};
//!
//! let tasks = vec![Task::new("T1", 60, vec!["R".into()]).with_window(540, 720)];
//! let resources = vec![Resource::new("R").with_window(540, 720)];
//!
//! let engine = Engine::new();
//! let response = engine.solve(&SolveRequest::new(tasks, resources)).unwrap();
//! assert_eq!(response.schedule.get("T1").unwrap().start, 540);
//! ```
//!
//! # References
//!
//! - Russell & Norvig (2021), "Artificial Intelligence", Ch. 6 (CSPs)
//! - Glover & Laguna (1997), "Tabu Search"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

pub mod cache;
pub mod config;
pub mod constraints;
pub mod cp;
pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod solver;
pub mod validation;
