//! Input validation for scheduling problems.
//!
//! Checks structural integrity of tasks and resources before any solver
//! runs. Detects:
//! - Duplicate IDs
//! - Empty or unknown resource requirements
//! - Duration out of bounds, windows that cannot fit the duration
//! - Malformed, unsorted, overlapping, or adjacent availability intervals
//! - Capacity other than 1
//!
//! Validation failures surface immediately, before the cache or any solver
//! is touched.

use std::collections::HashSet;

use crate::models::{Resource, Task};

/// Maximum task duration (minutes): one day.
const MAX_DURATION: i64 = 1440;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A task requires no resources.
    EmptyResourceSet,
    /// A task references a resource that doesn't exist.
    UnknownResource,
    /// Duration outside 1..=1440 minutes.
    InvalidDuration,
    /// The feasible window cannot contain the duration.
    WindowTooSmall,
    /// An availability or preferred interval is malformed or out of order.
    MalformedInterval,
    /// A resource declares a capacity other than 1.
    UnsupportedCapacity,
    /// Anything else (used by ad-hoc request checks).
    Other,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Builds an `Other` error from a bare message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::Other, message)
    }
}

/// Validates the input data for a scheduling problem.
///
/// All checks run and every detected issue is reported, not just the first.
pub fn validate_problem(tasks: &[Task], resources: &[Resource]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut resource_ids = HashSet::new();
    for r in resources {
        if !resource_ids.insert(r.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate resource ID '{}'", r.id),
            ));
        }
        if r.capacity != 1 {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnsupportedCapacity,
                format!("resource '{}' has capacity {}, only 1 is supported", r.id, r.capacity),
            ));
        }
        check_availability(r, &mut errors);
    }

    let mut task_ids = HashSet::new();
    for task in tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate task ID '{}'", task.id),
            ));
        }

        if task.duration < 1 || task.duration > MAX_DURATION {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!(
                    "task '{}' duration {} outside 1..={MAX_DURATION}",
                    task.id, task.duration
                ),
            ));
        }

        if task.required_resources.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyResourceSet,
                format!("task '{}' requires no resources", task.id),
            ));
        }

        if task.earliest_start + task.duration > task.latest_end {
            errors.push(ValidationError::new(
                ValidationErrorKind::WindowTooSmall,
                format!(
                    "task '{}' cannot fit {} minutes into [{}, {})",
                    task.id, task.duration, task.earliest_start, task.latest_end
                ),
            ));
        }

        for r_id in &task.required_resources {
            if !resource_ids.contains(r_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownResource,
                    format!("task '{}' references unknown resource '{r_id}'", task.id),
                ));
            }
        }

        for w in &task.preferred_windows {
            if w.start >= w.end {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MalformedInterval,
                    format!(
                        "task '{}' preferred window [{}, {}) is empty or inverted",
                        task.id, w.start, w.end
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Availability intervals must be well-formed, sorted ascending, and
/// neither overlapping nor adjacent.
fn check_availability(resource: &Resource, errors: &mut Vec<ValidationError>) {
    for w in &resource.availability {
        if w.start >= w.end {
            errors.push(ValidationError::new(
                ValidationErrorKind::MalformedInterval,
                format!(
                    "resource '{}' window [{}, {}) is empty or inverted",
                    resource.id, w.start, w.end
                ),
            ));
        }
    }
    for pair in resource.availability.windows(2) {
        if pair[1].start <= pair[0].end {
            errors.push(ValidationError::new(
                ValidationErrorKind::MalformedInterval,
                format!(
                    "resource '{}' windows [{}, {}) and [{}, {}) are unsorted, overlapping, or adjacent",
                    resource.id, pair[0].start, pair[0].end, pair[1].start, pair[1].end
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resources() -> Vec<Resource> {
        vec![
            Resource::new("R").with_window(480, 1020),
            Resource::new("A").with_window(540, 900),
        ]
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new("T1", 60, vec!["R".into(), "A".into()]).with_window(480, 900),
            Task::new("T2", 30, vec!["R".into()]).with_window(480, 900),
        ]
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_problem(&sample_tasks(), &sample_resources()).is_ok());
    }

    #[test]
    fn test_duplicate_task_id() {
        let tasks = vec![
            Task::new("T1", 60, vec!["R".into()]),
            Task::new("T1", 30, vec!["R".into()]),
        ];
        let errors = validate_problem(&tasks, &sample_resources()).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_duplicate_resource_id() {
        let resources = vec![Resource::new("R").with_window(0, 10), Resource::new("R")];
        let errors = validate_problem(&[], &resources).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_empty_resource_set() {
        let tasks = vec![Task::new("T1", 60, vec![])];
        let errors = validate_problem(&tasks, &sample_resources()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::EmptyResourceSet));
    }

    #[test]
    fn test_unknown_resource() {
        let tasks = vec![Task::new("T1", 60, vec!["NOPE".into()])];
        let errors = validate_problem(&tasks, &sample_resources()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownResource));
    }

    #[test]
    fn test_duration_exceeds_window() {
        // Duration 120 cannot fit a 100-minute window.
        let tasks = vec![Task::new("T1", 120, vec!["R".into()]).with_window(0, 100)];
        let errors = validate_problem(&tasks, &sample_resources()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::WindowTooSmall));
    }

    #[test]
    fn test_duration_bounds() {
        let tasks = vec![
            Task::new("zero", 0, vec!["R".into()]),
            Task::new("huge", 2000, vec!["R".into()]).with_window(0, 4000),
        ];
        let errors = validate_problem(&tasks, &sample_resources()).unwrap_err();
        let count = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvalidDuration)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_overlapping_availability() {
        let resources = vec![Resource::new("R").with_window(0, 100).with_window(50, 150)];
        let errors = validate_problem(&[], &resources).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MalformedInterval));
    }

    #[test]
    fn test_adjacent_availability_rejected() {
        let resources = vec![Resource::new("R").with_window(0, 100).with_window(100, 200)];
        let errors = validate_problem(&[], &resources).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MalformedInterval));
    }

    #[test]
    fn test_capacity_must_be_one() {
        let mut r = Resource::new("R").with_window(0, 100);
        r.capacity = 2;
        let errors = validate_problem(&[], &[r]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnsupportedCapacity));
    }

    #[test]
    fn test_inverted_preferred_window() {
        let tasks = vec![Task::new("T1", 30, vec!["R".into()]).with_preferred(200, 100)];
        let errors = validate_problem(&tasks, &sample_resources()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MalformedInterval));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let tasks = vec![
            Task::new("T1", 0, vec![]),
            Task::new("T1", 60, vec!["NOPE".into()]),
        ];
        let errors = validate_problem(&tasks, &sample_resources()).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
