//! Solver error types.
//!
//! Infeasibility and timeout are normal outcomes of a bounded search and
//! carry structured payloads; `Internal` marks invariant violations that
//! should never happen in correct operation.

use thiserror::Error;

use crate::models::Schedule;
use crate::validation::ValidationError;

/// Result alias for solver operations.
pub type SolveResult<T> = Result<T, SolveError>;

/// Errors surfaced by the scheduling engine.
#[derive(Debug, Error)]
pub enum SolveError {
    /// Malformed problem input. Carries every violation found.
    #[error("invalid input: {}", format_validation(.0))]
    InvalidInput(Vec<ValidationError>),

    /// No schedule satisfying the hard constraints exists.
    #[error("infeasible{}: {reason}", format_task(.task_id))]
    Infeasible {
        reason: String,
        task_id: Option<String>,
    },

    /// The wall-clock budget elapsed mid-search.
    ///
    /// `partial` carries the best feasible schedule found so far, if any.
    #[error("solve timed out{}", format_partial(.partial))]
    Timeout { partial: Option<Schedule> },

    /// The external CP oracle could not be invoked.
    #[error("CP oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Invariant violation inside the engine. Never expected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SolveError {
    /// Builds an `Infeasible` error without a task attribution.
    pub fn infeasible(reason: impl Into<String>) -> Self {
        SolveError::Infeasible {
            reason: reason.into(),
            task_id: None,
        }
    }

    /// Builds an `Infeasible` error attributed to a task.
    pub fn infeasible_task(reason: impl Into<String>, task_id: impl Into<String>) -> Self {
        SolveError::Infeasible {
            reason: reason.into(),
            task_id: Some(task_id.into()),
        }
    }

    /// Builds an `InvalidInput` error from a single message.
    pub fn invalid(message: impl Into<String>) -> Self {
        SolveError::InvalidInput(vec![ValidationError::other(message)])
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_task(task_id: &Option<String>) -> String {
    match task_id {
        Some(id) => format!(" for task '{id}'"),
        None => String::new(),
    }
}

fn format_partial(partial: &Option<Schedule>) -> &'static str {
    if partial.is_some() {
        " (partial schedule available)"
    } else {
        ""
    }
}
